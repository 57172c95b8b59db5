//! Gateway settings
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, then `CANLINK__<SECTION>__<KEY>` environment variables.

use cloud_sync::DEFAULT_SEND_BUFFER;
use ring_buffer::{OverflowPolicy, DEFAULT_CAPACITY};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "canlink.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level gateway settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bus: BusSettings,
    pub uplink: UplinkSettings,
    pub queue: QueueSettings,
    pub logging: LogSettings,
    pub metrics: MetricsSettings,
}

/// CAN bus source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusSettings {
    /// SocketCAN interface (e.g. "can0", "vcan0")
    pub interface: String,
    /// Receive timeout; bounds how long shutdown waits on an idle bus
    pub read_timeout_ms: u64,
    /// Use the synthetic bus instead of hardware
    pub simulate: bool,
    /// Tick of the synthetic bus
    pub simulate_interval_ms: u64,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            interface: "can0".to_string(),
            read_timeout_ms: 200,
            simulate: false,
            simulate_interval_ms: 100,
        }
    }
}

impl BusSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn simulate_interval(&self) -> Duration {
        Duration::from_millis(self.simulate_interval_ms)
    }
}

/// Collector connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UplinkSettings {
    /// WebSocket URL of the collector
    pub url: String,
    /// Longest idle wait before re-checking link and queue
    pub idle_poll_ms: u64,
    /// Messages the transport buffers before refusing sends
    pub send_buffer: usize,
}

impl Default for UplinkSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/api/ws/send".to_string(),
            idle_poll_ms: 50,
            send_buffer: DEFAULT_SEND_BUFFER,
        }
    }
}

/// Hand-off queue
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            overflow: OverflowPolicy::DropOldest,
        }
    }
}

/// Log output
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Prometheus exporter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Listen address; exporter disabled when unset
    pub listen: Option<SocketAddr>,
}

impl Settings {
    /// Load from `path` (if it exists) and the environment
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("CANLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.uplink.url.starts_with("ws://") && !self.uplink.url.starts_with("wss://") {
            return Err(ConfigError::Invalid(format!(
                "uplink.url must be a ws:// or wss:// URL, got {:?}",
                self.uplink.url
            )));
        }
        if self.queue.capacity == 0 {
            return Err(ConfigError::Invalid("queue.capacity must be > 0".to_string()));
        }
        if !self.bus.simulate && self.bus.interface.is_empty() {
            return Err(ConfigError::Invalid(
                "bus.interface is required unless bus.simulate is set".to_string(),
            ));
        }
        if self.uplink.idle_poll_ms == 0 {
            return Err(ConfigError::Invalid("uplink.idle_poll_ms must be > 0".to_string()));
        }
        if self.uplink.send_buffer == 0 {
            return Err(ConfigError::Invalid("uplink.send_buffer must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Config file path: first CLI argument, then `CANLINK_CONFIG`, then the default
pub fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CANLINK_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.bus.read_timeout(), Duration::from_millis(200));
        assert_eq!(settings.queue.overflow, OverflowPolicy::DropOldest);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/canlink.toml")).unwrap();
        assert_eq!(settings.uplink.idle_poll_ms, 50);
    }

    #[test]
    fn test_load_from_toml() {
        let path = std::env::temp_dir().join(format!("canlink-test-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[bus]
interface = "vcan0"
simulate = true

[uplink]
url = "ws://collector.local:9000/ingest"

[queue]
capacity = 16
overflow = "drop_newest"
"#
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.bus.interface, "vcan0");
        assert!(settings.bus.simulate);
        assert_eq!(settings.uplink.url, "ws://collector.local:9000/ingest");
        assert_eq!(settings.queue.capacity, 16);
        assert_eq!(settings.queue.overflow, OverflowPolicy::DropNewest);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let mut settings = Settings::default();
        settings.uplink.url = "http://collector".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_send_buffer() {
        let mut settings = Settings::default();
        settings.uplink.send_buffer = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut settings = Settings::default();
        settings.queue.capacity = 0;
        assert!(settings.validate().is_err());
    }
}
