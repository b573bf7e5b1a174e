//! Document store abstraction.
//!
//! The migration engine never talks to a driver directly; it goes through
//! [`SourceStore`] and [`TargetStore`], which classify every driver failure
//! into a [`StoreError`] variant so callers dispatch on tags instead of
//! driver-specific error codes.

mod memory;
mod mongo;

pub use memory::{MemorySourceStore, MemoryTargetStore};
pub use mongo::MongoStore;

use async_trait::async_trait;
use bson::Document;
use thiserror::Error;

/// Store failure classes, as seen by the migration engine.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An identity collision: the document (or one in its batch) already
    /// exists under the same `_id` or another unique key.
    #[error("duplicate identity: {0}")]
    Conflict(String),

    /// A connection-level failure that might succeed on retry.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of a single replace-or-insert keyed on `_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No document with this identity existed; a fresh one was inserted.
    Inserted,
    /// An existing document was replaced with different content.
    Replaced,
    /// An identical document was already present; nothing changed.
    Unchanged,
}

/// Read side of a migration.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// List every collection in the store, in store-reported order.
    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// Count the documents in a collection.
    async fn count_documents(&self, collection: &str) -> StoreResult<u64>;

    /// Fetch every document in a collection, in read order.
    async fn read_all(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Release the underlying connection.
    async fn close(&self);
}

/// Write side of a migration.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Count the documents in a collection.
    async fn count_documents(&self, collection: &str) -> StoreResult<u64>;

    /// Delete every document in a collection. Returns the number removed.
    async fn clear_collection(&self, collection: &str) -> StoreResult<u64>;

    /// Unordered bulk insert of one batch. The store may apply documents in
    /// any order and report partial success as a [`StoreError::Conflict`].
    /// Returns the number inserted on full success.
    async fn insert_batch(&self, collection: &str, batch: &[Document]) -> StoreResult<u64>;

    /// Replace-or-insert one document keyed on its `_id` field.
    async fn upsert_by_id(&self, collection: &str, doc: &Document) -> StoreResult<UpsertOutcome>;

    /// Release the underlying connection.
    async fn close(&self);
}

/// Render a document's identity for error messages.
pub(crate) fn identity_of(doc: &Document) -> String {
    match doc.get("_id") {
        Some(id) => id.to_string(),
        None => "<no _id>".to_string(),
    }
}
