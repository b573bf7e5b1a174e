//! Per-collection data transfer with two-tier conflict handling.
//!
//! The fast path submits fixed-size batches as unordered bulk inserts. When
//! a batch comes back with a conflict-class error the engine retries that
//! batch one document at a time as replace-or-insert keyed on `_id`, so an
//! overlapping destination still converges to a fully loaded state.

use crate::catalog::CollectionPlan;
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::store::{identity_of, SourceStore, StoreError, TargetStore, UpsertOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Transfer engine configuration.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Documents per bulk insert batch.
    pub batch_size: usize,
    /// Emit the overwriting progress counter on stdout.
    pub show_progress: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            show_progress: true,
        }
    }
}

/// Terminal state of one collection's transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    /// All batches were attempted; counts tell the rest.
    Migrated,
    /// The source collection held no documents; the destination was never
    /// touched.
    SkippedEmpty,
    /// A non-conflict error stopped this collection partway.
    Failed,
}

/// Per-collection transfer accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// Collection name.
    pub collection: String,
    /// Source document count snapshot.
    pub total: u64,
    /// Documents written to the destination.
    pub migrated: u64,
    /// Documents already present (identical) and left alone.
    pub skipped: u64,
    /// Documents that could not be written.
    pub failed: u64,
    /// Non-fatal error descriptions, in occurrence order.
    pub errors: Vec<String>,
    /// Terminal state.
    pub status: CollectionStatus,
}

impl TransferOutcome {
    fn new(collection: &str, total: u64) -> Self {
        Self {
            collection: collection.to_string(),
            total,
            migrated: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
            status: CollectionStatus::Migrated,
        }
    }

    fn skipped_empty(collection: &str) -> Self {
        Self {
            status: CollectionStatus::SkippedEmpty,
            ..Self::new(collection, 0)
        }
    }

    /// Outcome for a collection that failed before any batch work.
    pub fn failed(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(&collection.into(), 0).into_failed(message)
    }

    fn into_failed(mut self, message: impl Into<String>) -> Self {
        self.status = CollectionStatus::Failed;
        self.errors.push(message.into());
        self
    }

    /// Documents accounted for so far.
    pub fn processed(&self) -> u64 {
        self.migrated + self.skipped + self.failed
    }
}

/// Moves one collection at a time from source to destination.
pub struct TransferEngine {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    config: TransferConfig,
}

impl TransferEngine {
    /// Create a new transfer engine.
    pub fn new(
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        config: TransferConfig,
    ) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    /// Copy every document of `name` into the destination.
    ///
    /// Store errors hit before the source count is known propagate as `Err`;
    /// everything later is folded into a failed outcome so the caller still
    /// sees this collection's counts. Either way the failure stays
    /// collection-scoped.
    pub async fn migrate_collection(&self, name: &str) -> Result<TransferOutcome> {
        let plan = CollectionPlan::snapshot(self.source.as_ref(), name).await?;
        if plan.is_empty() {
            info!("{}: empty, skipping", name);
            return Ok(TransferOutcome::skipped_empty(name));
        }

        let outcome = TransferOutcome::new(name, plan.source_count);

        let plan = match plan.with_destination_count(self.target.as_ref()).await {
            Ok(plan) => plan,
            Err(err) => {
                return Ok(outcome.into_failed(format!("destination count failed: {}", err)))
            }
        };
        if plan.dest_count > 0 {
            warn!(
                "{}: destination already holds {} documents; deleting them before the copy",
                name, plan.dest_count
            );
            if let Err(err) = self.target.clear_collection(name).await {
                return Ok(outcome.into_failed(format!("destination clear failed: {}", err)));
            }
        }

        let documents = match self.source.read_all(name).await {
            Ok(documents) => documents,
            Err(err) => return Ok(outcome.into_failed(format!("source read failed: {}", err))),
        };
        let mut outcome = outcome;
        let mut progress = ProgressReporter::new(self.config.show_progress);

        for batch in documents.chunks(self.config.batch_size.max(1)) {
            match self.target.insert_batch(name, batch).await {
                Ok(inserted) => outcome.migrated += inserted,
                Err(StoreError::Conflict(reason)) => {
                    debug!("{}: batch conflict, retrying per document ({})", name, reason);
                    self.upsert_batch(name, batch, &mut outcome).await;
                }
                Err(err) => {
                    outcome
                        .errors
                        .push(format!("batch insert failed: {}", err));
                    outcome.status = CollectionStatus::Failed;
                    break;
                }
            }
            progress.update(outcome.processed(), outcome.total);
        }
        progress.finish();

        info!(
            "{}: {} migrated, {} skipped, {} failed of {}",
            name, outcome.migrated, outcome.skipped, outcome.failed, outcome.total
        );
        Ok(outcome)
    }

    /// Slow path: replay a conflicted batch one document at a time.
    ///
    /// Document-scoped failures are recorded and never stop the batch.
    async fn upsert_batch(
        &self,
        collection: &str,
        batch: &[bson::Document],
        outcome: &mut TransferOutcome,
    ) {
        for doc in batch {
            match self.target.upsert_by_id(collection, doc).await {
                Ok(UpsertOutcome::Inserted) | Ok(UpsertOutcome::Replaced) => {
                    outcome.migrated += 1;
                }
                Ok(UpsertOutcome::Unchanged) | Err(StoreError::Conflict(_)) => {
                    outcome.skipped += 1;
                }
                Err(err) => {
                    outcome.failed += 1;
                    outcome.errors.push(format!(
                        "document {}: {}",
                        identity_of(doc),
                        err
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySourceStore, MemoryTargetStore, StoreResult};
    use async_trait::async_trait;
    use bson::{doc, Document};

    fn quiet() -> TransferConfig {
        TransferConfig {
            batch_size: 100,
            show_progress: false,
        }
    }

    fn docs(range: std::ops::Range<i32>) -> Vec<Document> {
        range.map(|i| doc! {"_id": i, "value": i * 10}).collect()
    }

    #[tokio::test]
    async fn clean_copy_reconciles_counts() {
        let source =
            Arc::new(MemorySourceStore::new().with_collection("users", docs(0..250)));
        let target = Arc::new(MemoryTargetStore::new());
        let engine = TransferEngine::new(source, target.clone(), quiet());

        let outcome = engine.migrate_collection("users").await.unwrap();

        assert_eq!(outcome.status, CollectionStatus::Migrated);
        assert_eq!(outcome.total, 250);
        assert_eq!(outcome.migrated, 250);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.failed, 0);
        assert!(outcome.errors.is_empty());
        assert_eq!(target.documents("users").len(), 250);
    }

    #[tokio::test]
    async fn empty_collection_never_touches_destination() {
        let source = Arc::new(MemorySourceStore::new().with_collection("audit", vec![]));
        let target = Arc::new(MemoryTargetStore::new());
        let engine = TransferEngine::new(source, target.clone(), quiet());

        let outcome = engine.migrate_collection("audit").await.unwrap();

        assert_eq!(outcome.status, CollectionStatus::SkippedEmpty);
        assert_eq!(outcome.migrated, 0);
        assert!(target.collection_names().is_empty());
    }

    #[tokio::test]
    async fn pre_existing_destination_is_cleared_first() {
        let source =
            Arc::new(MemorySourceStore::new().with_collection("users", docs(0..5)));
        let target = Arc::new(
            MemoryTargetStore::new()
                .with_documents("users", vec![doc! {"_id": 99, "stale": true}]),
        );
        let engine = TransferEngine::new(source, target.clone(), quiet());

        let outcome = engine.migrate_collection("users").await.unwrap();

        assert_eq!(outcome.migrated, 5);
        let remaining = target.documents("users");
        assert_eq!(remaining.len(), 5);
        assert!(remaining.iter().all(|d| d.get("stale").is_none()));
    }

    #[tokio::test]
    async fn repeated_runs_do_not_accumulate() {
        let source =
            Arc::new(MemorySourceStore::new().with_collection("users", docs(0..42)));
        let target = Arc::new(MemoryTargetStore::new());

        let engine = TransferEngine::new(source.clone(), target.clone(), quiet());
        let first = engine.migrate_collection("users").await.unwrap();

        let engine = TransferEngine::new(source, target.clone(), quiet());
        let second = engine.migrate_collection("users").await.unwrap();

        assert_eq!(first.migrated, 42);
        assert_eq!(second.migrated, 42);
        assert_eq!(target.documents("users").len(), 42);
    }

    #[tokio::test]
    async fn conflict_falls_back_to_per_document_upserts() {
        // 100 documents where one _id appears twice with identical content:
        // the bulk insert conflicts and the per-document pass resolves it.
        let mut documents = docs(0..99);
        documents.insert(50, documents[49].clone());
        let source =
            Arc::new(MemorySourceStore::new().with_collection("orders", documents));
        let target = Arc::new(MemoryTargetStore::new());
        let engine = TransferEngine::new(source, target.clone(), quiet());

        let outcome = engine.migrate_collection("orders").await.unwrap();

        assert_eq!(outcome.status, CollectionStatus::Migrated);
        assert_eq!(outcome.migrated, 99);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.failed, 0);
        assert!(outcome.errors.is_empty());
        assert_eq!(target.documents("orders").len(), 99);
    }

    /// Target that refuses bulk inserts outright, forcing the fallback, and
    /// rejects one specific document during the per-document pass.
    struct PoisonTarget {
        inner: MemoryTargetStore,
        poison_id: i32,
    }

    #[async_trait]
    impl TargetStore for PoisonTarget {
        async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
            self.inner.count_documents(collection).await
        }

        async fn clear_collection(&self, collection: &str) -> StoreResult<u64> {
            self.inner.clear_collection(collection).await
        }

        async fn insert_batch(
            &self,
            _collection: &str,
            _batch: &[Document],
        ) -> StoreResult<u64> {
            Err(StoreError::Conflict("synthetic duplicate".into()))
        }

        async fn upsert_by_id(
            &self,
            collection: &str,
            doc: &Document,
        ) -> StoreResult<UpsertOutcome> {
            if matches!(doc.get("_id"), Some(bson::Bson::Int32(i)) if *i == self.poison_id) {
                return Err(StoreError::Other("document too large".into()));
            }
            self.inner.upsert_by_id(collection, doc).await
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn document_failure_is_recorded_and_non_blocking() {
        let source =
            Arc::new(MemorySourceStore::new().with_collection("events", docs(0..10)));
        let target = Arc::new(PoisonTarget {
            inner: MemoryTargetStore::new(),
            poison_id: 3,
        });
        let engine = TransferEngine::new(source, target, quiet());

        let outcome = engine.migrate_collection("events").await.unwrap();

        assert_eq!(outcome.status, CollectionStatus::Migrated);
        assert_eq!(outcome.migrated, 9);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("document too large"));
    }

    /// Target whose bulk insert fails with a non-conflict error.
    struct BrokenTarget {
        inner: MemoryTargetStore,
    }

    #[async_trait]
    impl TargetStore for BrokenTarget {
        async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
            self.inner.count_documents(collection).await
        }

        async fn clear_collection(&self, collection: &str) -> StoreResult<u64> {
            self.inner.clear_collection(collection).await
        }

        async fn insert_batch(
            &self,
            _collection: &str,
            _batch: &[Document],
        ) -> StoreResult<u64> {
            Err(StoreError::Transient("connection reset".into()))
        }

        async fn upsert_by_id(
            &self,
            collection: &str,
            doc: &Document,
        ) -> StoreResult<UpsertOutcome> {
            self.inner.upsert_by_id(collection, doc).await
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn non_conflict_batch_error_marks_collection_failed() {
        let source =
            Arc::new(MemorySourceStore::new().with_collection("users", docs(0..10)));
        let target = Arc::new(BrokenTarget {
            inner: MemoryTargetStore::new(),
        });
        let engine = TransferEngine::new(source, target, quiet());

        let outcome = engine.migrate_collection("users").await.unwrap();

        assert_eq!(outcome.status, CollectionStatus::Failed);
        assert_eq!(outcome.migrated, 0);
        assert!(outcome.errors[0].contains("connection reset"));
    }

    #[tokio::test]
    async fn batches_respect_configured_size() {
        // 250 documents at batch size 100 -> 3 bulk inserts, all clean.
        let source =
            Arc::new(MemorySourceStore::new().with_collection("big", docs(0..250)));
        let target = Arc::new(MemoryTargetStore::new());
        let engine = TransferEngine::new(
            source,
            target.clone(),
            TransferConfig {
                batch_size: 100,
                show_progress: false,
            },
        );

        let outcome = engine.migrate_collection("big").await.unwrap();
        assert_eq!(outcome.migrated, 250);
        assert_eq!(target.documents("big").len(), 250);
    }
}
