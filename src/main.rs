//! Affinity batch job entrypoint.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use tokio::signal;

use affinity::config::{Config, Preferences};
use affinity::freshness::JsonFileFreshnessStore;
use affinity::jobs::{JobDriver, JobFlags, JobName, JsonLinesSink, SnapshotSource};
use affinity::model::UserId;
use affinity::scoring::MatchEngine;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Run match-scoring batch jobs.
#[derive(Debug, Parser)]
#[command(name = "affinity", version)]
struct Cli {
    /// Jobs to run, in order (`trait-profiles`, `match-scores`).
    #[arg(required = true, value_parser = parse_job)]
    jobs: Vec<JobName>,

    /// Process a single user.
    #[arg(long = "user-id", visible_alias = "userId")]
    user_id: Option<u64>,

    /// Targets per batch.
    #[arg(long = "batch-size", visible_alias = "target-batch-size", alias = "batchSize")]
    batch_size: Option<usize>,

    /// Candidates per page.
    #[arg(long = "candidate-batch-size", alias = "candidateBatchSize")]
    candidate_batch_size: Option<usize>,

    /// Pause between batches, in milliseconds.
    #[arg(long = "pause-ms", alias = "pauseMs")]
    pause_ms: Option<u64>,

    /// Matches kept per viewer.
    #[arg(long = "top-k")]
    top_k: Option<usize>,

    /// Ignore stored freshness for this run.
    #[arg(long = "full-refresh", alias = "fullRefresh")]
    full_refresh: bool,
}

impl Cli {
    fn flags(&self, config: &Config) -> JobFlags {
        let defaults = JobFlags::from_config(config);
        JobFlags {
            user_id: self.user_id.map(UserId),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            candidate_batch_size: self
                .candidate_batch_size
                .unwrap_or(defaults.candidate_batch_size),
            pause: self.pause_ms.map_or(defaults.pause, Duration::from_millis),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            full_refresh: self.full_refresh,
        }
    }
}

fn parse_job(raw: &str) -> Result<JobName, String> {
    raw.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.validate()?;
    let prefs = Preferences::from_env()?;
    let flags = cli.flags(&config);

    tracing::info!(
        jobs = ?cli.jobs,
        algorithm_version = %config.algorithm_version,
        full_recompute = config.full_recompute,
        full_refresh = flags.full_refresh,
        "Affinity starting"
    );

    let engine = MatchEngine::new(prefs)?;
    let source = SnapshotSource::load(&config.data_path)
        .await
        .with_context(|| format!("loading {}", config.data_path.display()))?;
    ensure_parent(&config.output_path).await?;
    let sink = JsonLinesSink::open(&config.output_path)
        .await
        .with_context(|| format!("opening {}", config.output_path.display()))?;
    let store = JsonFileFreshnessStore::new(&config.freshness_path);

    let shutdown = Arc::new(AtomicBool::new(false));
    tokio::spawn(watch_shutdown(Arc::clone(&shutdown)));

    let driver = JobDriver::new(engine, config, source, sink, store).with_shutdown(shutdown);
    let reports = driver.run_group(&cli.jobs, &flags).await?;

    for (job, report) in cli.jobs.iter().zip(&reports) {
        tracing::info!(
            job = %job,
            processed = report.processed,
            skipped_fresh = report.skipped_fresh,
            failed = report.failed,
            batches = report.batches,
            cancelled = report.cancelled,
            "Job report"
        );
    }

    tracing::info!("Affinity finished");
    Ok(())
}

async fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

/// Sets `shutdown` on Ctrl+C or SIGTERM; the driver stops at the next batch boundary.
async fn watch_shutdown(shutdown: Arc<AtomicBool>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, finishing current batch");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, finishing current batch");
        }
    }

    shutdown.store(true, Ordering::SeqCst);
}
