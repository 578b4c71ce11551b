use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use super::error::{FreshnessError, StoreError};
use super::store::FreshnessStore;
use super::types::FreshnessRecord;

/// Decides whether a `(job, scope)` unit must be recomputed.
///
/// An unavailable store disables the optimization instead of failing the job:
/// [`FreshnessCache::is_fresh`] answers `false` and
/// [`FreshnessCache::mark_computed`] is a no-op.
#[derive(Debug)]
pub struct FreshnessCache<S> {
    store: S,
    force_recompute: bool,
}

impl<S: FreshnessStore> FreshnessCache<S> {
    pub fn new(store: S, force_recompute: bool) -> Self {
        Self {
            store,
            force_recompute,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn force_recompute(&self) -> bool {
        self.force_recompute
    }

    /// `true` iff the stored hash for the unit equals `input_hash` and no
    /// recompute override is active.
    #[instrument(skip(self, input_hash), fields(force = self.force_recompute))]
    pub async fn is_fresh(
        &self,
        job_name: &str,
        scope: &str,
        input_hash: &str,
    ) -> Result<bool, FreshnessError> {
        if self.force_recompute {
            return Ok(false);
        }

        match self.store.get(job_name, scope).await {
            Ok(Some(record)) => Ok(record.input_hash == input_hash),
            Ok(None) => Ok(false),
            Err(StoreError::Unavailable { reason }) => {
                warn!(%reason, "freshness store unavailable; treating unit as stale");
                Ok(false)
            }
            Err(e) => Err(FreshnessError::Store(e)),
        }
    }

    /// Records a successful computation.
    #[instrument(skip(self, input_hash))]
    pub async fn mark_computed(
        &self,
        job_name: &str,
        scope: &str,
        input_hash: &str,
        computed_at: DateTime<Utc>,
    ) -> Result<(), FreshnessError> {
        let record = FreshnessRecord::new(job_name, scope, input_hash, computed_at);
        match self.store.upsert(record).await {
            Ok(()) => Ok(()),
            Err(StoreError::Unavailable { reason }) => {
                debug!(%reason, "freshness store unavailable; skipping mark");
                Ok(())
            }
            Err(e) => Err(FreshnessError::Store(e)),
        }
    }
}
