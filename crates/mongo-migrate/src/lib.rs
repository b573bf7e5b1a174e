//! # mongo-migrate
//!
//! One-shot MongoDB to MongoDB database migration library.
//!
//! Copies every collection of a source database into a destination
//! database, collection by collection, with:
//!
//! - **Bulk transfers** using unordered batch inserts
//! - **Conflict fallback** to per-document upserts keyed on `_id`
//! - **Failure isolation** so one bad collection never aborts the run
//! - **Count reconciliation** in an auditable final summary
//!
//! ## Example
//!
//! ```rust,no_run
//! use mongo_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mongo_migrate::Result<()> {
//!     let config = Config::from_env()?;
//!     let orchestrator = Orchestrator::connect(config).await?;
//!     let result = orchestrator.run().await?;
//!     println!("Migrated {} documents", result.summary.documents_migrated);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod store;
pub mod transfer;

// Re-exports for convenient access
pub use catalog::CollectionPlan;
pub use config::{Config, EndpointConfig, MigrationConfig};
pub use error::{MigrateError, Result};
pub use orchestrator::{CountCheck, MigrationResult, Orchestrator};
pub use progress::{MigrationSummary, ProgressReporter};
pub use store::{MongoStore, SourceStore, StoreError, TargetStore, UpsertOutcome};
pub use transfer::{CollectionStatus, TransferConfig, TransferEngine, TransferOutcome};
