// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Lower bound for the naptime tunable, in seconds.
pub const NAPTIME_MIN: u64 = 1;
/// Upper bound for the naptime tunable, in seconds.
pub const NAPTIME_MAX: u64 = 60;
/// Default naptime when none is configured.
pub const NAPTIME_DEFAULT: u64 = 1;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub poller: PollerSettings,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
}

/// Tunables for the polling loop.
///
/// `naptime_seconds` is the idle duration between poll cycles, bounded
/// to [NAPTIME_MIN, NAPTIME_MAX]. Out-of-range values are clamped at
/// load time so the loop itself never observes an invalid interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerSettings {
    #[serde(default = "default_naptime")]
    pub naptime_seconds: u64,
    /// Exit code used when the poller stops on a terminate signal.
    /// Parent death always exits 1; a failed cycle exits non-zero via
    /// error propagation.
    #[serde(default)]
    pub exit_code_on_terminate: i32,
}

fn default_naptime() -> u64 {
    NAPTIME_DEFAULT
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            naptime_seconds: NAPTIME_DEFAULT,
            exit_code_on_terminate: 0,
        }
    }
}

impl PollerSettings {
    /// The configured naptime with the [1, 60] bounds applied.
    pub fn naptime_seconds_clamped(&self) -> u64 {
        clamp_naptime(self.naptime_seconds)
    }
}

/// Clamp a naptime value to the supported bounds, warning when the
/// configured value had to be adjusted.
pub fn clamp_naptime(seconds: u64) -> u64 {
    let clamped = seconds.clamp(NAPTIME_MIN, NAPTIME_MAX);
    if clamped != seconds {
        warn!(
            configured = seconds,
            clamped,
            "naptime_seconds out of bounds, clamping"
        );
    }
    clamped
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_port: u16,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment-specific configuration
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.observability.metrics_port == 0 {
            return Err("Metrics port must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost:5432/postgres".to_string(),
                max_connections: 5,
                min_connections: 1,
                connect_timeout_seconds: 30,
            },
            poller: PollerSettings::default(),
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_port: 9090,
            },
        }
    }
}

/// Source the polling loop reloads its settings from.
///
/// The production implementation re-reads the layered configuration
/// files; tests swap in an in-memory source. A failed load keeps the
/// previous settings in effect, so a reload can never abort the loop.
pub trait ConfigSource: Send + Sync {
    fn load_poller(&self) -> Result<PollerSettings, ConfigError>;
}

/// Re-reads poller settings from the layered configuration directory.
pub struct FileConfigSource {
    config_dir: PathBuf,
}

impl FileConfigSource {
    pub fn new<P: Into<PathBuf>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn load_poller(&self) -> Result<PollerSettings, ConfigError> {
        Settings::load_from_path(&self.config_dir).map(|settings| settings.poller)
    }
}
