use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, error, info, instrument, warn};

use super::error::{JobError, JobResult};
use super::source::{DataSource, ResultSink};
use super::types::{JobFlags, JobName, JobReport, TraitProfile};
use crate::config::Config;
use crate::freshness::{FreshnessCache, FreshnessStore};
use crate::hashing::InputHasher;
use crate::model::{FeatureBundle, UserId};
use crate::scoring::MatchEngine;

/// Result of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    Computed,
    SkippedFresh,
}

/// Pages through targets in bounded batches and runs one unit of work per target.
///
/// Units within a batch run with bounded fan-out (`Config::max_concurrency`). A failed
/// unit is logged and counted; units already committed stay committed. The shutdown
/// flag is checked between batches.
pub struct JobDriver<D, R, S> {
    engine: MatchEngine,
    config: Config,
    source: D,
    sink: R,
    cache: FreshnessCache<S>,
    shutdown: Arc<AtomicBool>,
    clock: Option<DateTime<Utc>>,
}

impl<D, R, S> JobDriver<D, R, S>
where
    D: DataSource,
    R: ResultSink,
    S: FreshnessStore,
{
    /// Creates a driver. `config.full_recompute` disables freshness skips for every run.
    pub fn new(engine: MatchEngine, config: Config, source: D, sink: R, store: S) -> Self {
        let cache = FreshnessCache::new(store, config.full_recompute);
        Self {
            engine,
            config,
            source,
            sink,
            cache,
            shutdown: Arc::new(AtomicBool::new(false)),
            clock: None,
        }
    }

    /// Shares an externally owned shutdown flag.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Pins "now" for every unit. Defaults to the wall clock.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn cache(&self) -> &FreshnessCache<S> {
        &self.cache
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    /// Runs `jobs` in the given order. Never reorders them.
    pub async fn run_group(&self, jobs: &[JobName], flags: &JobFlags) -> JobResult<Vec<JobReport>> {
        validate_order(jobs)?;

        let mut reports = Vec::with_capacity(jobs.len());
        for &job in jobs {
            let report = self.run(job, flags).await?;
            let cancelled = report.cancelled;
            reports.push(report);
            if cancelled {
                break;
            }
        }
        Ok(reports)
    }

    /// Runs one job over a single target or all targets.
    #[instrument(skip(self, flags))]
    pub async fn run(&self, job: JobName, flags: &JobFlags) -> JobResult<JobReport> {
        validate_flags(flags)?;
        let mut report = JobReport::default();

        if let Some(id) = flags.user_id {
            report.batches = 1;
            match self.run_unit(job, id, flags).await {
                Ok(outcome) => tally(&mut report, outcome),
                Err(e @ JobError::NotFound { .. }) => return Err(e),
                Err(e) => {
                    error!(user = %id, error = %e, "Unit failed");
                    report.failed += 1;
                }
            }
            info!(?report, "Job finished");
            return Ok(report);
        }

        let mut after = None;
        loop {
            if self.is_shutdown_requested() {
                warn!(batches = report.batches, "Shutdown requested; stopping between batches");
                report.cancelled = true;
                break;
            }

            let ids = self.source.target_ids(after, flags.batch_size).await?;
            let Some(&last) = ids.last() else {
                break;
            };
            report.batches += 1;
            self.run_batch(job, report.batches, &ids, flags, &mut report)
                .await;
            after = Some(last);

            if ids.len() < flags.batch_size {
                break;
            }
            if !flags.pause.is_zero() {
                tokio::time::sleep(flags.pause).await;
            }
        }

        info!(?report, "Job finished");
        Ok(report)
    }

    #[instrument(skip(self, ids, flags, report), fields(size = ids.len()))]
    async fn run_batch(
        &self,
        job: JobName,
        batch: usize,
        ids: &[UserId],
        flags: &JobFlags,
        report: &mut JobReport,
    ) {
        let outcomes: Vec<(UserId, JobResult<UnitOutcome>)> = stream::iter(ids.iter().copied())
            .map(|id| async move { (id, self.run_unit(job, id, flags).await) })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        for (id, outcome) in outcomes {
            match outcome {
                Ok(outcome) => tally(report, outcome),
                Err(e) => {
                    error!(user = %id, error = %e, "Unit failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            skipped_fresh = report.skipped_fresh,
            failed = report.failed,
            "Batch complete"
        );
    }

    async fn run_unit(&self, job: JobName, id: UserId, flags: &JobFlags) -> JobResult<UnitOutcome> {
        match job {
            JobName::TraitProfiles => self.trait_profile_unit(id, flags).await,
            JobName::MatchScores => self.match_scores_unit(id, flags).await,
        }
    }

    async fn load_target(&self, id: UserId) -> JobResult<FeatureBundle> {
        self.source
            .feature_bundle(id)
            .await?
            .ok_or(JobError::NotFound { id })
    }

    async fn skip_if_fresh(
        &self,
        job: JobName,
        scope: &str,
        input_hash: &str,
        flags: &JobFlags,
    ) -> JobResult<bool> {
        if flags.full_refresh {
            return Ok(false);
        }
        let fresh = self.cache.is_fresh(job.as_str(), scope, input_hash).await?;
        if fresh {
            debug!(job = %job, scope, "Inputs unchanged; skipping");
        }
        Ok(fresh)
    }

    #[instrument(skip(self, flags))]
    async fn trait_profile_unit(&self, id: UserId, flags: &JobFlags) -> JobResult<UnitOutcome> {
        let job = JobName::TraitProfiles;
        let bundle = self.load_target(id).await?;
        let scope = id.to_string();

        let mut hasher = InputHasher::new(job.as_str(), &self.config.algorithm_version);
        hasher.update(&bundle.traits)?;
        let input_hash = hasher.finalize();

        if self.skip_if_fresh(job, &scope, &input_hash, flags).await? {
            return Ok(UnitOutcome::SkippedFresh);
        }

        let now = self.now();
        let profile = TraitProfile::from_bundle(&bundle);
        self.sink.write_trait_profile(&profile, now).await?;
        self.cache
            .mark_computed(job.as_str(), &scope, &input_hash, now)
            .await?;
        Ok(UnitOutcome::Computed)
    }

    /// Streams candidate pages twice: once into the input hash and, only when the
    /// hash is stale, once more through the top-K ranker.
    #[instrument(skip(self, flags))]
    async fn match_scores_unit(&self, id: UserId, flags: &JobFlags) -> JobResult<UnitOutcome> {
        let job = JobName::MatchScores;
        let viewer = self.load_target(id).await?;
        let scope = id.to_string();
        let now = self.now();

        let mut hasher = InputHasher::new(job.as_str(), &self.config.algorithm_version);
        hasher
            .update(&as_of(now))?
            .update(self.engine.prefs())?
            .update(&flags.top_k)?
            .update(&viewer)?;

        let mut after = None;
        loop {
            let page = self
                .source
                .candidate_page(id, after, flags.candidate_batch_size)
                .await?;
            for candidate in page.iter().filter(|c| c.id != id) {
                hasher.update(candidate)?;
            }
            match page.last() {
                Some(last) if page.len() >= flags.candidate_batch_size => after = Some(last.id),
                _ => break,
            }
        }
        let input_hash = hasher.finalize();

        if self.skip_if_fresh(job, &scope, &input_hash, flags).await? {
            return Ok(UnitOutcome::SkippedFresh);
        }

        let mut ranker = self.engine.ranker(&viewer, now, flags.top_k);
        let mut after = None;
        loop {
            let page = self
                .source
                .candidate_page(id, after, flags.candidate_batch_size)
                .await?;
            ranker.offer_all(&page);
            match page.last() {
                Some(last) if page.len() >= flags.candidate_batch_size => after = Some(last.id),
                _ => break,
            }
        }
        let ranking = ranker.finish();
        debug!(
            matches = ranking.matches.len(),
            evaluated = ranking.evaluated,
            pruned = ranking.pruned,
            "Ranked candidates"
        );

        self.sink.write_scores(id, &ranking.matches, now).await?;
        self.cache
            .mark_computed(job.as_str(), &scope, &input_hash, now)
            .await?;
        Ok(UnitOutcome::Computed)
    }
}

/// Checks that no job in `jobs` precedes a declared dependency also in `jobs`.
///
/// Dependencies missing from the group are the caller's responsibility and only
/// produce a warning.
pub fn validate_order(jobs: &[JobName]) -> JobResult<()> {
    for (i, &job) in jobs.iter().enumerate() {
        for &dependency in job.depends_on() {
            match jobs.iter().position(|&j| j == dependency) {
                Some(pos) if pos > i => {
                    return Err(JobError::DependencyOrder { job, dependency });
                }
                Some(_) => {}
                None => warn!(
                    job = %job,
                    dependency = %dependency,
                    "Dependency not part of this group; it must already have run"
                ),
            }
        }
    }
    Ok(())
}

/// UTC calendar day, so recency-dependent output is recomputed daily.
fn as_of(now: DateTime<Utc>) -> String {
    now.date_naive().to_string()
}

fn validate_flags(flags: &JobFlags) -> JobResult<()> {
    for (name, value) in [
        ("batch size", flags.batch_size),
        ("candidate batch size", flags.candidate_batch_size),
        ("top k", flags.top_k),
    ] {
        if value == 0 {
            return Err(JobError::Validation {
                reason: format!("{name} must be greater than zero"),
            });
        }
    }
    Ok(())
}

fn tally(report: &mut JobReport, outcome: UnitOutcome) {
    match outcome {
        UnitOutcome::Computed => report.processed += 1,
        UnitOutcome::SkippedFresh => report.skipped_fresh += 1,
    }
}
