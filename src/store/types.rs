//! Registry and identity types for the collector store.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Target option key for the remote host address. Required.
pub const OPTION_HOST: &str = "host";
/// Target option key for the Engine API version. Required.
pub const OPTION_API_VERSION: &str = "apiVersion";
/// Target option key for the remote port. Optional, defaults to 2375.
pub const OPTION_PORT: &str = "port";

/// Collector type classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CollectorType {
    /// Docker Engine inventory collector.
    Docker,
}

/// An error captured against the collector identity record.
///
/// Kept for schema parity with the identity document consumed by dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionError {
    /// Machine-readable error class.
    pub error_code: String,
    /// Human-readable description.
    pub error_message: String,
    /// Unix seconds when the error occurred.
    pub timestamp: i64,
}

/// The orchestrator's own registration record, one per collector name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorIdentity {
    /// Database ID (None for new records).
    pub id: Option<i64>,
    /// Unique collector name.
    pub name: String,
    /// Collector type tag.
    pub collector_type: CollectorType,
    /// Whether the collector is enabled.
    pub enabled: bool,
    /// Whether the collector is currently online.
    pub online: bool,
    /// Accumulated error log.
    pub errors: Vec<CollectionError>,
    /// Unix seconds of the last completed cycle.
    pub last_executed: i64,
    /// Wall-clock time of the last completed cycle (RFC3339).
    pub last_executed_time: Option<String>,
    /// Duration of the last cycle in whole seconds.
    pub last_executed_seconds: i64,
    /// Cumulative count of records collected across all cycles.
    pub record_count: i64,
}

impl CollectorIdentity {
    /// Create a fresh identity with zeroed run statistics.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            collector_type: CollectorType::Docker,
            enabled: true,
            online: true,
            errors: Vec::new(),
            last_executed: 0,
            last_executed_time: None,
            last_executed_seconds: 0,
            record_count: 0,
        }
    }
}

/// A configured collection target: one remote Docker Engine endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Database ID (None for records not yet persisted).
    pub id: Option<i64>,
    /// Unique target name.
    pub name: String,
    /// Free-form display description.
    pub description: Option<String>,
    /// Whether this target participates in collection cycles.
    pub enabled: bool,
    /// Connection options. Must contain `host` and `apiVersion`;
    /// `port` is reserved.
    pub options: BTreeMap<String, String>,
    /// Unix seconds of the last collection attempt against this target.
    pub last_updated: i64,
}

impl Target {
    /// Create a new enabled target with the given connection options.
    pub fn new(name: impl Into<String>, host: impl Into<String>, api_version: impl Into<String>) -> Self {
        let mut options = BTreeMap::new();
        options.insert(OPTION_HOST.to_string(), host.into());
        options.insert(OPTION_API_VERSION.to_string(), api_version.into());
        Self {
            id: None,
            name: name.into(),
            description: None,
            enabled: true,
            options,
            last_updated: 0,
        }
    }

    /// Look up a connection option by key.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Set the optional port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.options.insert(OPTION_PORT.to_string(), port.to_string());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// End-of-cycle summary written to the identity record.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Wall-clock duration of the whole cycle.
    pub duration: Duration,
    /// Records collected this cycle; added to the cumulative counter.
    pub records: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_collector_type_strings() {
        assert_eq!(CollectorType::Docker.as_ref(), "docker");
        assert_eq!(CollectorType::from_str("DOCKER").unwrap(), CollectorType::Docker);
        assert!(CollectorType::from_str("kubernetes").is_err());
    }

    #[test]
    fn test_target_options() {
        let target = Target::new("prod-host", "10.0.0.5", "1.43").with_port(2376);

        assert_eq!(target.option(OPTION_HOST), Some("10.0.0.5"));
        assert_eq!(target.option(OPTION_API_VERSION), Some("1.43"));
        assert_eq!(target.option(OPTION_PORT), Some("2376"));
        assert_eq!(target.option("missing"), None);
        assert!(target.enabled);
    }

    #[test]
    fn test_identity_defaults() {
        let identity = CollectorIdentity::new("docker-collector");
        assert_eq!(identity.name, "docker-collector");
        assert!(identity.id.is_none());
        assert!(identity.online);
        assert_eq!(identity.record_count, 0);
        assert_eq!(identity.last_executed, 0);
    }
}
