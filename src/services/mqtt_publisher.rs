//! src/services/mqtt_publisher.rs
//!
//! Bus connector: one persistent MQTT connection opened at startup and shared
//! by every request. Handlers only see the `Publisher` trait so tests can swap
//! in a fake without a broker.

use crate::config::MqttConfig;
use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{
    AsyncClient, ClientError, ConnectionError, Event, EventLoop, MqttOptions,
    Outgoing, Packet, QoS,
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("could not connect to MQTT broker: {0}")]
    Connect(#[from] ConnectionError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("MQTT connection lost: {0}")]
    ConnectionLost(String),
    #[error("MQTT publisher is disconnected")]
    Disconnected,
}

pub type PublishResult<T> = Result<T, PublishError>;

/// Sends payloads to a message-bus topic.
///
/// Implementations must be safe to call from many handler tasks at once; the
/// upload path adds no locking of its own.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `payload` to `topic`, returning once the transport has
    /// confirmed the message left this process or the attempt failed.
    async fn publish(&self, topic: &str, payload: Bytes) -> PublishResult<()>;
}

/// Capacity of rumqttc's request channel between client handles and the event loop.
const REQUEST_CHANNEL_CAPACITY: usize = 64;

type Confirmation = oneshot::Sender<PublishResult<()>>;
type PendingQueue = Arc<Mutex<VecDeque<Confirmation>>>;

/// Production `Publisher` backed by a rumqttc connection.
///
/// QoS 0 carries no broker acknowledgment, so a publish is confirmed when the
/// event loop reports the PUBLISH packet as written. Confirmations arrive in
/// the same order requests were enqueued, which `enqueue` guarantees by
/// serializing the hand-off to the client.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    enqueue: Arc<AsyncMutex<()>>,
    pending: PendingQueue,
}

impl MqttPublisher {
    /// Open the broker connection and wait for CONNACK.
    ///
    /// No retry is attempted; a failed handshake is returned to the caller.
    /// rumqttc reports a refusing CONNACK as a `ConnectionError` from `poll`.
    pub async fn connect(config: &MqttConfig) -> PublishResult<Self> {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        loop {
            match eventloop.poll().await? {
                Event::Incoming(Packet::ConnAck(_)) => break,
                event => debug!(?event, "MQTT event before CONNACK"),
            }
        }

        info!(
            "Connected to MQTT broker at {}:{} as {}",
            config.host, config.port, config.client_id
        );

        let pending: PendingQueue = Arc::new(Mutex::new(VecDeque::new()));
        tokio::spawn(drive_event_loop(eventloop, pending.clone()));

        Ok(Self {
            client,
            enqueue: Arc::new(AsyncMutex::new(())),
            pending,
        })
    }

    /// Send DISCONNECT to the broker. Errors are logged, never returned.
    pub async fn disconnect(&self) {
        if let Err(err) = self.client.disconnect().await {
            warn!("Failed to disconnect from MQTT broker: {}", err);
        }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> PublishResult<()> {
        let confirmed = {
            let _order = self.enqueue.lock().await;
            let (tx, rx) = oneshot::channel();
            lock(&self.pending).push_back(tx);

            if let Err(err) = self
                .client
                .publish(topic, QoS::AtMostOnce, false, payload.to_vec())
                .await
            {
                lock(&self.pending).pop_back();
                return Err(err.into());
            }
            rx
        };

        confirmed.await.map_err(|_| PublishError::Disconnected)?
    }
}

/// Poll the connection until it fails or disconnects, confirming publishes
/// as their packets go out.
async fn drive_event_loop(mut eventloop: EventLoop, pending: PendingQueue) {
    let reason = loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Publish(_))) => {
                if let Some(tx) = lock(&pending).pop_front() {
                    let _ = tx.send(Ok(()));
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("Disconnected from MQTT broker");
                break "client disconnected".to_string();
            }
            Ok(event) => debug!(?event, "MQTT event"),
            Err(err) => {
                error!("MQTT connection lost: {}", err);
                break err.to_string();
            }
        }
    };

    // Close the request channel first so later publishes fail fast.
    drop(eventloop);

    for tx in lock(&pending).drain(..) {
        let _ = tx.send(Err(PublishError::ConnectionLost(reason.clone())));
    }
}

fn lock(pending: &PendingQueue) -> MutexGuard<'_, VecDeque<Confirmation>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}
