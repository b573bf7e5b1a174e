//! Migration orchestrator - main workflow coordinator.

use crate::catalog::{self, CollectionPlan};
use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::progress::MigrationSummary;
use crate::store::{MongoStore, SourceStore, TargetStore};
use crate::transfer::{CollectionStatus, TransferConfig, TransferEngine, TransferOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Migration orchestrator.
///
/// Owns both store handles for the lifetime of one run and releases them on
/// every exit path.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: "completed" or "partial".
    pub status: String,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Aggregate document and collection counts.
    pub summary: MigrationSummary,

    /// Names of collections that failed.
    pub failed_collections: Vec<String>,

    /// Per-collection outcomes, in processing order.
    pub outcomes: Vec<TransferOutcome>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One collection's source-vs-destination count comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountCheck {
    pub collection: String,
    pub source: u64,
    pub destination: u64,
    pub matches: bool,
}

impl Orchestrator {
    /// Establish both store connections, each under its own timeout budget.
    ///
    /// Fails fast on missing configuration before any network activity. A
    /// destination failure closes the already-open source handle before the
    /// error propagates.
    pub async fn connect(config: Config) -> Result<Self> {
        config.validate()?;
        let timeout = Duration::from_secs(config.migration.connect_timeout_secs);

        info!("Connecting to source");
        let source = MongoStore::connect(
            &config.source.uri,
            config.source.database.as_deref(),
            "source",
            timeout,
        )
        .await?;

        info!("Connecting to destination");
        let target = match MongoStore::connect(
            &config.destination.uri,
            config.destination.database.as_deref(),
            "destination",
            timeout,
        )
        .await
        {
            Ok(store) => store,
            Err(err) => {
                SourceStore::close(&source).await;
                return Err(err);
            }
        };

        Ok(Self {
            config,
            source: Arc::new(source),
            target: Arc::new(target),
        })
    }

    /// Build an orchestrator over pre-constructed stores.
    pub fn with_stores(
        config: Config,
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
    ) -> Self {
        Self {
            config,
            source,
            target,
        }
    }

    /// Run the migration, then release both stores.
    pub async fn run(self) -> Result<MigrationResult> {
        let result = self.run_inner().await;
        self.close().await;
        result
    }

    /// Enumerate collections and snapshot counts without writing anything.
    pub async fn plan(self) -> Result<Vec<CollectionPlan>> {
        let result = self.plan_inner().await;
        self.close().await;
        result
    }

    /// Compare per-collection document counts between source and destination.
    pub async fn validate(self) -> Result<Vec<CountCheck>> {
        let result = self.validate_inner().await;
        self.close().await;
        result
    }

    /// Release both stores without doing any work. Used by connection
    /// health checks.
    pub async fn shutdown(self) {
        self.close().await;
    }

    async fn close(&self) {
        self.source.close().await;
        self.target.close().await;
    }

    async fn run_inner(&self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting migration run: {}", run_id);

        let names = catalog::enumerate(self.source.as_ref())
            .await
            .map_err(MigrateError::Store)?;
        info!("Found {} collections to migrate", names.len());

        let engine = TransferEngine::new(
            self.source.clone(),
            self.target.clone(),
            TransferConfig {
                batch_size: self.config.migration.batch_size,
                show_progress: !self.config.migration.quiet_progress,
            },
        );

        let mut summary = MigrationSummary {
            collections_found: names.len(),
            ..Default::default()
        };
        let mut outcomes = Vec::with_capacity(names.len());

        for name in &names {
            info!("Migrating collection: {}", name);
            // Collection-scoped boundary: one bad collection never aborts
            // the run.
            let outcome = match engine.migrate_collection(name).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!("{}: failed - {}", name, err);
                    TransferOutcome::failed(name.clone(), err.to_string())
                }
            };
            summary.absorb(&outcome);
            outcomes.push(outcome);
        }

        // The summary prints even when collections failed, so operators can
        // see exactly what needs a manual re-run.
        println!("{}", summary.render());

        let failed_collections: Vec<String> = outcomes
            .iter()
            .filter(|o| o.status == CollectionStatus::Failed)
            .map(|o| o.collection.clone())
            .collect();

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let status = summary.status().to_string();

        info!(
            "Migration {}: {}/{} documents across {} collections in {:.1}s",
            status,
            summary.documents_migrated,
            summary.documents_total,
            summary.collections_found,
            duration
        );

        Ok(MigrationResult {
            run_id,
            status,
            started_at,
            completed_at,
            duration_seconds: duration,
            summary,
            failed_collections,
            outcomes,
        })
    }

    async fn plan_inner(&self) -> Result<Vec<CollectionPlan>> {
        let names = catalog::enumerate(self.source.as_ref())
            .await
            .map_err(MigrateError::Store)?;

        let mut plans = Vec::with_capacity(names.len());
        for name in &names {
            let plan = CollectionPlan::snapshot(self.source.as_ref(), name)
                .await
                .map_err(MigrateError::Store)?
                .with_destination_count(self.target.as_ref())
                .await
                .map_err(MigrateError::Store)?;
            info!(
                "{}: {} source documents, {} already in destination",
                plan.name, plan.source_count, plan.dest_count
            );
            plans.push(plan);
        }
        Ok(plans)
    }

    async fn validate_inner(&self) -> Result<Vec<CountCheck>> {
        let names = catalog::enumerate(self.source.as_ref())
            .await
            .map_err(MigrateError::Store)?;

        let mut checks = Vec::with_capacity(names.len());
        for name in &names {
            let source = SourceStore::count_documents(self.source.as_ref(), name)
                .await
                .map_err(MigrateError::Store)?;
            let destination = TargetStore::count_documents(self.target.as_ref(), name)
                .await
                .map_err(MigrateError::Store)?;
            let matches = source == destination;

            if matches {
                info!("{}: {} documents (match)", name, source);
            } else {
                warn!(
                    "{}: source={} destination={} (MISMATCH)",
                    name, source, destination
                );
            }

            checks.push(CountCheck {
                collection: name.clone(),
                source,
                destination,
                matches,
            });
        }
        Ok(checks)
    }
}
