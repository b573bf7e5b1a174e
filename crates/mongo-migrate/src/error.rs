//! Error types for the migration library.

use crate::store::StoreError;
use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A required endpoint (source or destination) was not configured.
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Configuration error (invalid YAML, bad field values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A store connection did not reach a ready state within its budget.
    #[error("Connection to {endpoint} did not become ready within {seconds}s")]
    ConnectionTimeout { endpoint: String, seconds: u64 },

    /// Store-level error surfaced outside a collection boundary.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Data transfer failed for a specific collection.
    #[error("Transfer failed for collection {collection}: {message}")]
    Transfer { collection: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Transfer error
    pub fn transfer(collection: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error class.
    ///
    /// Collection-level failures never surface here; only fatal classes
    /// reach the top-level error path.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::ConfigurationMissing(_)
            | MigrateError::Config(_)
            | MigrateError::Yaml(_) => 1,
            MigrateError::ConnectionTimeout { .. } => 2,
            MigrateError::Store(_) | MigrateError::Transfer { .. } | MigrateError::Json(_) => 3,
            MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
