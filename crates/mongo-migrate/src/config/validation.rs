//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
///
/// Missing endpoints fail fast, before any network activity.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.uri.is_empty() {
        return Err(MigrateError::ConfigurationMissing(
            "source.uri (or SOURCE_URI) is required".into(),
        ));
    }
    if config.destination.uri.is_empty() {
        return Err(MigrateError::ConfigurationMissing(
            "destination.uri (or DEST_URI) is required".into(),
        ));
    }

    if config.migration.batch_size == 0 {
        return Err(MigrateError::Config(
            "migration.batch_size must be at least 1".into(),
        ));
    }
    if config.migration.connect_timeout_secs == 0 {
        return Err(MigrateError::Config(
            "migration.connect_timeout_secs must be at least 1".into(),
        ));
    }

    // Copying a database onto itself would clear the source.
    if config.source.uri == config.destination.uri
        && config.source.database == config.destination.database
    {
        return Err(MigrateError::Config(
            "source and destination cannot be the same database".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, MigrationConfig};

    fn valid_config() -> Config {
        Config {
            source: EndpointConfig {
                uri: "mongodb://localhost:27017/app".to_string(),
                database: None,
            },
            destination: EndpointConfig {
                uri: "mongodb://localhost:27018/app".to_string(),
                database: None,
            },
            migration: MigrationConfig::default(),
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn rejects_missing_source() {
        let mut config = valid_config();
        config.source.uri.clear();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, MigrateError::ConfigurationMissing(_)));
        assert!(err.to_string().contains("source"));
    }

    #[test]
    fn rejects_missing_destination() {
        let mut config = valid_config();
        config.destination.uri.clear();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, MigrateError::ConfigurationMissing(_)));
        assert!(err.to_string().contains("destination"));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let mut config = valid_config();
        config.migration.batch_size = 0;
        assert!(matches!(
            validate(&config),
            Err(MigrateError::Config(_))
        ));
    }

    #[test]
    fn rejects_same_endpoint_both_sides() {
        let mut config = valid_config();
        config.destination.uri = config.source.uri.clone();
        assert!(matches!(validate(&config), Err(MigrateError::Config(_))));
    }
}
