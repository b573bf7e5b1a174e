//! In-memory store implementation.
//!
//! Backs the engine and orchestrator test suites; behaves like a document
//! store with a unique index on `_id`. Bulk inserts are atomic: a batch
//! containing any identity collision is rejected whole, which is one of the
//! partial-success shapes an unordered bulk write is allowed to take.

use super::{SourceStore, StoreError, StoreResult, TargetStore, UpsertOutcome};
use async_trait::async_trait;
use bson::Document;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Read-only source backed by an ordered list of named collections.
#[derive(Default)]
pub struct MemorySourceStore {
    collections: Vec<(String, Vec<Document>)>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection; enumeration preserves insertion order.
    pub fn with_collection(
        mut self,
        name: impl Into<String>,
        docs: Vec<Document>,
    ) -> Self {
        self.collections.push((name.into(), docs));
        self
    }

    fn find(&self, name: &str) -> StoreResult<&Vec<Document>> {
        self.collections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, docs)| docs)
            .ok_or_else(|| StoreError::Other(format!("no such collection: {}", name)))
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        Ok(self.collections.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
        Ok(self.find(collection)?.len() as u64)
    }

    async fn read_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        Ok(self.find(collection)?.clone())
    }

    async fn close(&self) {}
}

/// Writable target with a unique `_id` index per collection.
#[derive(Default)]
pub struct MemoryTargetStore {
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
}

impl MemoryTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a collection with existing documents.
    pub fn with_documents(self, name: impl Into<String>, docs: Vec<Document>) -> Self {
        self.lock().insert(name.into(), docs);
        self
    }

    /// Snapshot a collection's contents (empty if absent).
    pub fn documents(&self, name: &str) -> Vec<Document> {
        self.lock().get(name).cloned().unwrap_or_default()
    }

    /// Names of collections that have ever been written to.
    pub fn collection_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<Document>>> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TargetStore for MemoryTargetStore {
    async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
        Ok(self
            .lock()
            .get(collection)
            .map(|docs| docs.len() as u64)
            .unwrap_or(0))
    }

    async fn clear_collection(&self, collection: &str) -> StoreResult<u64> {
        let mut guard = self.lock();
        let removed = guard
            .get(collection)
            .map(|docs| docs.len() as u64)
            .unwrap_or(0);
        guard.insert(collection.to_string(), Vec::new());
        Ok(removed)
    }

    async fn insert_batch(&self, collection: &str, batch: &[Document]) -> StoreResult<u64> {
        let mut guard = self.lock();
        let docs = guard.entry(collection.to_string()).or_default();

        let mut incoming: Vec<&bson::Bson> = Vec::with_capacity(batch.len());
        for doc in batch {
            let id = doc
                .get("_id")
                .ok_or_else(|| StoreError::Other("document has no _id field".to_string()))?;
            let collides = docs.iter().any(|d| d.get("_id") == Some(id))
                || incoming.contains(&id);
            if collides {
                return Err(StoreError::Conflict(format!(
                    "duplicate _id {} in collection {}",
                    id, collection
                )));
            }
            incoming.push(id);
        }

        docs.extend(batch.iter().cloned());
        Ok(batch.len() as u64)
    }

    async fn upsert_by_id(&self, collection: &str, doc: &Document) -> StoreResult<UpsertOutcome> {
        let id = doc
            .get("_id")
            .cloned()
            .ok_or_else(|| StoreError::Other("document has no _id field".to_string()))?;

        let mut guard = self.lock();
        let docs = guard.entry(collection.to_string()).or_default();

        match docs.iter_mut().find(|d| d.get("_id") == Some(&id)) {
            Some(existing) if *existing == *doc => Ok(UpsertOutcome::Unchanged),
            Some(existing) => {
                let _ = std::mem::replace(existing, doc.clone());
                Ok(UpsertOutcome::Replaced)
            }
            None => {
                docs.push(doc.clone());
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn close(&self) {}
}
