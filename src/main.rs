//! Dockwatch binary entry point.
//!
//! Wires the configuration, store and collector together and runs the cron
//! loop until interrupted. Core functionality is provided by the `dockwatch`
//! library crate.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use dockwatch::{
    config::AppConfig,
    runtime::DockerConnector,
    store::{schema, ConnPool, DuckdbSink, Sink},
    CollectError, DockerCollector,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Dockwatch - Docker inventory collector
#[derive(Parser, Debug)]
#[command(name = "dockwatch", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "DOCKWATCH_CONFIG"
    )]
    config: String,

    /// Run a single collection cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dockwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let config = AppConfig::load(&cli.config)?;

    tracing::info!("Initializing store at: {}", config.database.path);
    let pool = ConnPool::open(Path::new(&config.database.path), config.database.pool_size)?;
    let conn = pool.get()?;
    schema::init_schema(&conn)?;

    let sink = Arc::new(DuckdbSink::new(pool));

    // Seed configured targets, insert only. The store stays authoritative
    // for targets added or toggled out of band.
    let mut inserted = 0;
    let mut skipped = 0;
    for target in config.to_targets() {
        match sink.insert_target_if_missing(&target).await? {
            Some(id) => {
                tracing::info!("Seeded target: {} (id={})", target.name, id);
                inserted += 1;
            }
            None => {
                tracing::debug!("Target already exists, skipping: {}", target.name);
                skipped += 1;
            }
        }
    }
    tracing::info!("Target seeding complete: {inserted} inserted, {skipped} skipped");

    let connector = DockerConnector::new().with_timeout(config.collector.request_timeout);
    let collector = DockerCollector::new(config.collector.name.clone(), sink, connector);

    if cli.once {
        let report = collector.collect().await?;
        tracing::info!(
            "Single cycle done: {} records, {} failed targets",
            report.records,
            report.failures.len()
        );
        return Ok(());
    }

    // Validated at config load, so this cannot fail here.
    let schedule = cron::Schedule::from_str(&config.collector.cron)
        .map_err(|e| format!("invalid cron expression: {e}"))?;
    tracing::info!("Scheduling collection with cron: {}", config.collector.cron);
    tracing::info!("Press Ctrl+C to shutdown");

    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            tracing::warn!("Cron schedule has no upcoming runs, exiting");
            break;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tracing::debug!("Next collection at {next}");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C signal");
                break;
            }
        }

        match collector.collect().await {
            Ok(report) => {
                if !report.failures.is_empty() {
                    tracing::warn!(
                        "Cycle finished with {} failed targets",
                        report.failures.len()
                    );
                }
            }
            // Without an identity there is no way to report run results;
            // stop instead of retrying registration forever.
            Err(e @ CollectError::Registration(_)) => {
                tracing::error!("Collector registration failed, shutting down: {e}");
                return Err(e.into());
            }
            Err(e) => tracing::error!("Collection cycle failed: {e}"),
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
