use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub max_upload_bytes: usize,
    pub spool_to_disk: bool,
    pub mqtt: MqttConfig,
}

/// Broker connection settings for the publisher.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
    pub keep_alive: Duration,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            topic: "file/bin".into(),
            client_id: "bin_relay_client".into(),
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Relay uploaded .bin files to an MQTT topic")]
pub struct Args {
    /// Host to bind to (overrides BIN_RELAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BIN_RELAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploads are spooled (overrides BIN_RELAY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Largest accepted request body in bytes (overrides BIN_RELAY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Publish straight from memory instead of spooling to disk first
    #[arg(long)]
    pub no_spool: bool,

    /// MQTT broker host (overrides BIN_RELAY_MQTT_HOST)
    #[arg(long)]
    pub mqtt_host: Option<String>,

    /// MQTT broker port (overrides BIN_RELAY_MQTT_PORT)
    #[arg(long)]
    pub mqtt_port: Option<u16>,

    /// Topic uploads are published to (overrides BIN_RELAY_MQTT_TOPIC)
    #[arg(long)]
    pub mqtt_topic: Option<String>,

    /// MQTT client identifier (overrides BIN_RELAY_MQTT_CLIENT_ID)
    #[arg(long)]
    pub mqtt_client_id: Option<String>,

    /// Keep-alive interval in seconds (overrides BIN_RELAY_MQTT_KEEP_ALIVE)
    #[arg(long)]
    pub mqtt_keep_alive: Option<u64>,
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Merge already-parsed CLI args over environment variables and defaults.
    pub fn from_args(args: Args) -> Result<Self> {
        let mqtt_defaults = MqttConfig::default();

        // --- Environment fallback ---
        let env_host = env::var("BIN_RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parse("BIN_RELAY_PORT", 8080u16)?;
        let env_storage = env::var("BIN_RELAY_STORAGE_DIR").unwrap_or_else(|_| ".".into());
        let env_max_upload = env_parse("BIN_RELAY_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let env_spool = env_parse("BIN_RELAY_SPOOL_TO_DISK", true)?;

        let env_mqtt_host = env::var("BIN_RELAY_MQTT_HOST").unwrap_or(mqtt_defaults.host);
        let env_mqtt_port = env_parse("BIN_RELAY_MQTT_PORT", mqtt_defaults.port)?;
        let env_topic = env::var("BIN_RELAY_MQTT_TOPIC").unwrap_or(mqtt_defaults.topic);
        let env_client_id =
            env::var("BIN_RELAY_MQTT_CLIENT_ID").unwrap_or(mqtt_defaults.client_id);
        let default_keep_alive = mqtt_defaults.keep_alive.as_secs();
        let env_keep_alive = env_parse("BIN_RELAY_MQTT_KEEP_ALIVE", default_keep_alive)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            spool_to_disk: !args.no_spool && env_spool,
            mqtt: MqttConfig {
                host: args.mqtt_host.unwrap_or(env_mqtt_host),
                port: args.mqtt_port.unwrap_or(env_mqtt_port),
                topic: args.mqtt_topic.unwrap_or(env_topic),
                client_id: args.mqtt_client_id.unwrap_or(env_client_id),
                keep_alive: Duration::from_secs(args.mqtt_keep_alive.unwrap_or(env_keep_alive)),
            },
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read `name` and parse it, falling back to `default` when it is unset.
fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
