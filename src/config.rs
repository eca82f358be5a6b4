//! Application configuration.
//!
//! YAML-based configuration covering the database, the collector's own
//! identity and schedule, and the static list of Docker Engine targets the
//! collector polls. Targets declared here are seeded into the store at
//! startup; the store is the authority from then on.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::Target;

/// Default connection pool size.
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Default per-request timeout for Engine API calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default collection schedule (hourly, on the hour).
pub const DEFAULT_CRON: &str = "0 0 * * * *";

fn default_pool_size() -> u32 {
    DEFAULT_POOL_SIZE
}

fn default_cron() -> String {
    DEFAULT_CRON.to_string()
}

fn default_enabled() -> bool {
    true
}

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path.
    pub path: String,

    /// Connection pool size (default: 4).
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "dockwatch.db".to_string(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Collector identity and schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Name the collector registers itself under (default: "dockwatch").
    pub name: String,

    /// Cron expression with seconds field (default: hourly).
    pub cron: String,

    /// Per-request timeout for Engine API calls (default: 10s).
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            name: "dockwatch".to_string(),
            cron: default_cron(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// One Docker Engine endpoint to poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Unique target name.
    pub name: String,

    /// Engine host (IP or hostname).
    pub host: String,

    /// Engine API version, e.g. "1.43".
    pub api_version: String,

    /// Engine API port (default: the client's default, 2375).
    #[serde(default)]
    pub port: Option<u16>,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Disabled targets stay in the store but are skipped by every cycle.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Collector identity and schedule.
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Targets to seed into the store at startup.
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.is_empty() {
            return Err(ConfigError::Validation(
                "database path must not be empty".to_string(),
            ));
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::Validation(
                "database pool_size must be positive".to_string(),
            ));
        }

        if self.collector.name.is_empty() {
            return Err(ConfigError::Validation(
                "collector name must not be empty".to_string(),
            ));
        }
        cron::Schedule::from_str(&self.collector.cron).map_err(|e| {
            ConfigError::Validation(format!(
                "invalid cron expression '{}': {}",
                self.collector.cron, e
            ))
        })?;
        if self.collector.request_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "collector request_timeout must be positive".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for target in &self.targets {
            if target.name.is_empty() {
                return Err(ConfigError::Validation(
                    "target name must not be empty".to_string(),
                ));
            }
            if !seen.insert(target.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate target name: '{}'",
                    target.name
                )));
            }
            if target.host.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "target '{}' has an empty host",
                    target.name
                )));
            }
            if target.api_version.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "target '{}' has an empty api_version",
                    target.name
                )));
            }
        }

        Ok(())
    }

    /// Convert the configured targets into store records for seeding.
    pub fn to_targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .map(|t| {
                let mut target =
                    Target::new(&t.name, &t.host, &t.api_version).with_enabled(t.enabled);
                if let Some(port) = t.port {
                    target = target.with_port(port);
                }
                if !t.description.is_empty() {
                    target = target.with_description(&t.description);
                }
                target
            })
            .collect()
    }
}
