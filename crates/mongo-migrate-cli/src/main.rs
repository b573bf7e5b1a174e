//! mongo-migrate CLI - one-shot MongoDB to MongoDB database migration.

use clap::{Parser, Subcommand};
use mongo_migrate::{Config, MigrateError, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "mongo-migrate")]
#[command(about = "One-shot MongoDB to MongoDB database migration")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (SOURCE_URI / DEST_URI are read
    /// from the environment when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every source collection into the destination database
    Run {
        /// Override documents per bulk insert batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Override the per-endpoint connection timeout in seconds
        #[arg(long)]
        connect_timeout: Option<u64>,

        /// List collections and counts without transferring any data
        #[arg(long)]
        dry_run: bool,

        /// Suppress the overwriting progress counter
        #[arg(long)]
        no_progress: bool,
    },

    /// Compare source and destination document counts per collection
    Validate,

    /// Test both store connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Run {
            batch_size,
            connect_timeout,
            dry_run,
            no_progress,
        } => {
            // Apply overrides
            if let Some(size) = batch_size {
                config.migration.batch_size = size;
            }
            if let Some(secs) = connect_timeout {
                config.migration.connect_timeout_secs = secs;
            }
            if no_progress {
                config.migration.quiet_progress = true;
            }
            config.validate()?;

            let orchestrator = Orchestrator::connect(config).await?;

            if dry_run {
                let plans = orchestrator.plan().await?;
                let total: u64 = plans.iter().map(|p| p.source_count).sum();
                println!(
                    "Would migrate {} collections ({} documents):",
                    plans.len(),
                    total
                );
                for plan in &plans {
                    println!(
                        "  {}: {} documents ({} already in destination)",
                        plan.name, plan.source_count, plan.dest_count
                    );
                }
                return Ok(());
            }

            let result = orchestrator.run().await?;
            if result.status != "completed" {
                warn!(
                    "Run finished partially: {} of {} documents migrated; re-run collections: {}",
                    result.summary.documents_migrated,
                    result.summary.documents_total,
                    result.failed_collections.join(", ")
                );
            }
            if cli.output_json {
                println!("{}", result.to_json()?);
            }
        }

        Commands::Validate => {
            let orchestrator = Orchestrator::connect(config).await?;
            let checks = orchestrator.validate().await?;

            let mismatched = checks.iter().filter(|c| !c.matches).count();
            if mismatched == 0 {
                println!("All {} collections match", checks.len());
            } else {
                println!(
                    "{} of {} collections have mismatched counts",
                    mismatched,
                    checks.len()
                );
            }
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&checks)?);
            }
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::connect(config).await?;
            orchestrator.shutdown().await;
            println!("Both endpoints are reachable");
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity: {}", other)),
    };

    let builder = tracing_subscriber::fmt().with_max_level(level);
    match format {
        "json" => builder.json().init(),
        "text" => builder.init(),
        other => return Err(format!("unknown log format: {}", other)),
    }
    Ok(())
}
