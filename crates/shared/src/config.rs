//! Application configuration management.

use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Sync and reconciliation configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Payment gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sync and reconciliation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// IANA zone whose midnight defines a calendar day.
    #[serde(default = "default_reference_timezone")]
    pub reference_timezone: String,
    /// Upper bound for a single document-store call, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// How long a local write shields its date from remote resyncs, in seconds.
    #[serde(default = "default_dirty_ttl_secs")]
    pub dirty_ttl_secs: u64,
}

fn default_reference_timezone() -> String {
    "UTC".to_string()
}

fn default_store_timeout_ms() -> u64 {
    10_000
}

fn default_dirty_ttl_secs() -> u64 {
    300 // 5 minutes
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reference_timezone: default_reference_timezone(),
            store_timeout_ms: default_store_timeout_ms(),
            dirty_ttl_secs: default_dirty_ttl_secs(),
        }
    }
}

impl SyncConfig {
    /// Parses the reference time zone.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone name is not a known IANA zone.
    pub fn timezone(&self) -> Result<Tz, config::ConfigError> {
        self.reference_timezone.parse::<Tz>().map_err(|_| {
            config::ConfigError::Message(format!(
                "unknown reference timezone: {}",
                self.reference_timezone
            ))
        })
    }

    /// Store call timeout.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Dirty-marker lifetime.
    #[must_use]
    pub fn dirty_ttl(&self) -> Duration {
        Duration::from_secs(self.dirty_ttl_secs)
    }
}

/// Payment gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Upper bound for a single gateway call, in milliseconds.
    #[serde(default = "default_gateway_timeout_ms")]
    pub timeout_ms: u64,
    /// Request the refund as soon as a completion becomes verified.
    #[serde(default)]
    pub auto_refund_on_verify: bool,
}

fn default_gateway_timeout_ms() -> u64 {
    15_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_gateway_timeout_ms(),
            auto_refund_on_verify: false,
        }
    }
}

impl GatewayConfig {
    /// Gateway call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "moneyvate=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("MONEYVATE").separator("__"))
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.sync.timezone()?;
        Ok(loaded)
    }
}
