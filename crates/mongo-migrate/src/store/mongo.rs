//! MongoDB-backed store implementation.

use super::{SourceStore, StoreError, StoreResult, TargetStore, UpsertOutcome};
use crate::error::{MigrateError, Result};
use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use std::time::Duration;
use tracing::debug;

/// Server error codes signalling a duplicate-key write.
const DUPLICATE_KEY_CODES: [i32; 2] = [11000, 11001];

/// One live MongoDB endpoint. Implements both the source and target sides;
/// a migration holds two of these.
#[derive(Debug)]
pub struct MongoStore {
    client: Client,
    db: Database,
    label: String,
}

impl MongoStore {
    /// Connect to an endpoint and verify it is ready, under a single
    /// timeout budget covering DNS, handshake, and the ping round-trip.
    ///
    /// `label` names the endpoint ("source" / "destination") in errors and
    /// log lines. The database comes from `database` if given, otherwise
    /// from the URI path.
    pub async fn connect(
        uri: &str,
        database: Option<&str>,
        label: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let connect = Self::connect_inner(uri, database, label, timeout);
        match tokio::time::timeout(timeout, connect).await {
            Ok(result) => result,
            Err(_) => Err(MigrateError::ConnectionTimeout {
                endpoint: label.to_string(),
                seconds: timeout.as_secs(),
            }),
        }
    }

    async fn connect_inner(
        uri: &str,
        database: Option<&str>,
        label: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| MigrateError::Config(format!("invalid {} URI: {}", label, e)))?;
        options.app_name = Some("mongo-migrate".to_string());
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options)
            .map_err(|e| MigrateError::Config(format!("invalid {} options: {}", label, e)))?;

        let db_name = match database {
            Some(name) => name.to_string(),
            None => client
                .default_database()
                .map(|db| db.name().to_string())
                .ok_or_else(|| {
                    MigrateError::ConfigurationMissing(format!(
                        "{} database name (set it in the URI path or the config file)",
                        label
                    ))
                })?,
        };
        let db = client.database(&db_name);

        // Client construction is lazy; a ping proves the endpoint is ready.
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MigrateError::Store(classify(e)))?;

        debug!("{}: connected to database '{}'", label, db_name);
        Ok(Self {
            client,
            db,
            label: label.to_string(),
        })
    }

    /// Name of the database this store operates on.
    pub fn database_name(&self) -> &str {
        self.db.name()
    }

    /// Endpoint label ("source" / "destination").
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl SourceStore for MongoStore {
    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.db.list_collection_names().await.map_err(classify)
    }

    async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
        self.db
            .collection::<Document>(collection)
            .count_documents(doc! {})
            .await
            .map_err(classify)
    }

    async fn read_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let cursor = self
            .db
            .collection::<Document>(collection)
            .find(doc! {})
            .await
            .map_err(classify)?;
        cursor.try_collect().await.map_err(classify)
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

#[async_trait]
impl TargetStore for MongoStore {
    async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
        self.db
            .collection::<Document>(collection)
            .count_documents(doc! {})
            .await
            .map_err(classify)
    }

    async fn clear_collection(&self, collection: &str) -> StoreResult<u64> {
        let result = self
            .db
            .collection::<Document>(collection)
            .delete_many(doc! {})
            .await
            .map_err(classify)?;
        Ok(result.deleted_count)
    }

    async fn insert_batch(&self, collection: &str, batch: &[Document]) -> StoreResult<u64> {
        let result = self
            .db
            .collection::<Document>(collection)
            .insert_many(batch)
            .ordered(false)
            .await
            .map_err(classify)?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn upsert_by_id(&self, collection: &str, doc: &Document) -> StoreResult<UpsertOutcome> {
        let id = doc
            .get("_id")
            .cloned()
            .ok_or_else(|| StoreError::Other("document has no _id field".to_string()))?;

        let result = self
            .db
            .collection::<Document>(collection)
            .replace_one(doc! { "_id": id }, doc.clone())
            .upsert(true)
            .await
            .map_err(classify)?;

        if result.upserted_id.is_some() {
            Ok(UpsertOutcome::Inserted)
        } else if result.modified_count > 0 {
            Ok(UpsertOutcome::Replaced)
        } else {
            Ok(UpsertOutcome::Unchanged)
        }
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

/// Map a driver error to the engine-facing taxonomy.
///
/// All error-code inspection lives here; the engine only ever pattern
/// matches on the resulting variants.
fn classify(err: mongodb::error::Error) -> StoreError {
    if is_duplicate_key(&err) {
        return StoreError::Conflict(err.to_string());
    }
    match &*err.kind {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => StoreError::Transient(err.to_string()),
        _ => StoreError::Other(err.to_string()),
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write)) => {
            is_duplicate_key_code(write.code)
        }
        ErrorKind::InsertMany(insert) => insert
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| is_duplicate_key_code(e.code))),
        ErrorKind::Command(command) => is_duplicate_key_code(command.code),
        _ => false,
    }
}

fn is_duplicate_key_code(code: i32) -> bool {
    DUPLICATE_KEY_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_codes() {
        assert!(is_duplicate_key_code(11000));
        assert!(is_duplicate_key_code(11001));
        assert!(!is_duplicate_key_code(0));
        assert!(!is_duplicate_key_code(50));
    }

    #[tokio::test]
    async fn connect_rejects_invalid_uri() {
        let err = MongoStore::connect("not-a-uri", None, "source", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
        assert!(err.to_string().contains("source"));
    }

    #[tokio::test]
    async fn connect_requires_a_database_name() {
        // No database in the URI path and none configured: fails before
        // any network activity.
        let err = MongoStore::connect(
            "mongodb://localhost:27017",
            None,
            "destination",
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MigrateError::ConfigurationMissing(_)));
    }
}
