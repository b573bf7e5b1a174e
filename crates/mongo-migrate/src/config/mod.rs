//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

/// Environment variable naming the source connection string.
pub const SOURCE_URI_VAR: &str = "SOURCE_URI";

/// Environment variable naming the destination connection string.
pub const DEST_URI_VAR: &str = "DEST_URI";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment
    /// (`SOURCE_URI` / `DEST_URI`).
    pub fn from_env() -> Result<Self> {
        Self::from_uris(
            std::env::var(SOURCE_URI_VAR).ok(),
            std::env::var(DEST_URI_VAR).ok(),
        )
    }

    /// Build configuration from two optional connection strings.
    pub fn from_uris(source: Option<String>, destination: Option<String>) -> Result<Self> {
        let config = Config {
            source: EndpointConfig {
                uri: source.unwrap_or_default(),
                database: None,
            },
            destination: EndpointConfig {
                uri: destination.unwrap_or_default(),
                database: None,
            },
            migration: MigrationConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}
