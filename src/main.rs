use anyhow::{Context, Result};
use axum::Router;
use bin_relay::{
    config::AppConfig,
    routes,
    services::{mqtt_publisher::MqttPublisher, upload_service::UploadService},
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting bin-relay with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if cfg.spool_to_disk && !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)
            .with_context(|| format!("creating storage directory {}", cfg.storage_dir))?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Connect to the broker (fatal on failure) ---
    let publisher = match MqttPublisher::connect(&cfg.mqtt).await {
        Ok(publisher) => publisher,
        Err(err) => {
            tracing::error!("Failed to connect to MQTT broker: {}", err);
            return Err(err).context("connecting to MQTT broker");
        }
    };

    // --- Initialize core service ---
    let uploads = UploadService::new(
        Arc::new(publisher.clone()),
        cfg.mqtt.topic.clone(),
        cfg.storage_dir.clone(),
        cfg.spool_to_disk,
    );

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes).with_state(uploads);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    publisher.disconnect().await;
    tracing::info!("Shut down cleanly");

    Ok(())
}

/// Resolve once Ctrl-C is received.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
