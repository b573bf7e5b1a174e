//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source store configuration.
    pub source: EndpointConfig,

    /// Destination store configuration.
    pub destination: EndpointConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// One store endpoint: a MongoDB connection string plus an optional
/// database name override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Connection string, e.g. `mongodb://localhost:27017/appdb`.
    #[serde(default)]
    pub uri: String,

    /// Database name. Falls back to the default database encoded in the
    /// URI path when not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Documents per bulk insert batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds each endpoint gets to reach a ready state.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Suppress the overwriting progress counter (log lines still print).
    #[serde(default)]
    pub quiet_progress: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            connect_timeout_secs: default_connect_timeout(),
            quiet_progress: false,
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_connect_timeout() -> u64 {
    30
}
