//! Source collection enumeration and per-collection planning.

use crate::store::{SourceStore, StoreResult, TargetStore};
use serde::{Deserialize, Serialize};

/// Snapshot the source's collection names, in store-reported order.
///
/// Collections created after this call are not part of the run.
pub async fn enumerate(source: &dyn SourceStore) -> StoreResult<Vec<String>> {
    source.list_collections().await
}

/// One collection to migrate, with counts snapshotted before transfer.
///
/// Counts are read once and never refreshed mid-transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionPlan {
    /// Collection name, identical on both sides.
    pub name: String,

    /// Source document count at enumeration time.
    pub source_count: u64,

    /// Documents already present in the destination before the copy.
    pub dest_count: u64,
}

impl CollectionPlan {
    /// Snapshot the source-side count for a collection.
    pub async fn snapshot(source: &dyn SourceStore, name: &str) -> StoreResult<Self> {
        let source_count = source.count_documents(name).await?;
        Ok(Self {
            name: name.to_string(),
            source_count,
            dest_count: 0,
        })
    }

    /// Record the destination's pre-transfer count.
    pub async fn with_destination_count(
        mut self,
        target: &dyn TargetStore,
    ) -> StoreResult<Self> {
        self.dest_count = target.count_documents(&self.name).await?;
        Ok(self)
    }

    /// True when the source side has nothing to copy.
    pub fn is_empty(&self) -> bool {
        self.source_count == 0
    }
}
