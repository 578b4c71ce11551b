//! File-backed data source and result sink used by the binary.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use super::error::BackendError;
use super::source::{DataSource, ResultSink};
use super::types::{JobName, TraitProfile};
use crate::model::{FeatureBundle, UserId};
use crate::scoring::RankedMatch;

/// Feature bundles held in memory, keyed and paged by id.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    bundles: BTreeMap<UserId, FeatureBundle>,
}

impl SnapshotSource {
    /// Later bundles replace earlier ones with the same id.
    pub fn from_bundles(bundles: impl IntoIterator<Item = FeatureBundle>) -> Self {
        Self {
            bundles: bundles.into_iter().map(|b| (b.id, b)).collect(),
        }
    }

    /// Loads a JSON array of feature bundles.
    pub async fn load(path: &Path) -> Result<Self, BackendError> {
        let bytes = tokio::fs::read(path).await?;
        let bundles: Vec<FeatureBundle> = serde_json::from_slice(&bytes)?;
        info!(path = %path.display(), users = bundles.len(), "Loaded feature snapshot");
        Ok(Self::from_bundles(bundles))
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Replaces or inserts one bundle.
    pub fn upsert(&mut self, bundle: FeatureBundle) {
        self.bundles.insert(bundle.id, bundle);
    }

    fn page(&self, after: Option<UserId>) -> impl Iterator<Item = &FeatureBundle> {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        self.bundles
            .range((lower, Bound::Unbounded))
            .map(|(_, bundle)| bundle)
    }
}

impl DataSource for SnapshotSource {
    async fn target_ids(
        &self,
        after: Option<UserId>,
        limit: usize,
    ) -> Result<Vec<UserId>, BackendError> {
        Ok(self.page(after).take(limit).map(|b| b.id).collect())
    }

    async fn feature_bundle(&self, id: UserId) -> Result<Option<FeatureBundle>, BackendError> {
        Ok(self.bundles.get(&id).cloned())
    }

    async fn candidate_page(
        &self,
        _viewer: UserId,
        after: Option<UserId>,
        limit: usize,
    ) -> Result<Vec<FeatureBundle>, BackendError> {
        Ok(self.page(after).take(limit).cloned().collect())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreRow<'a> {
    job: JobName,
    viewer: UserId,
    candidate: UserId,
    rank: usize,
    final_score: f64,
    components: &'a BTreeMap<&'static str, f64>,
    meta: &'a BTreeMap<&'static str, Value>,
    computed_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRow<'a> {
    job: JobName,
    #[serde(flatten)]
    profile: &'a TraitProfile,
    computed_at: DateTime<Utc>,
}

/// Append-only JSON-lines output, one object per persisted row.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it if needed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, buf: &[u8]) -> Result<(), BackendError> {
        let mut file = self.file.lock().await;
        file.write_all(buf).await?;
        file.flush().await?;
        Ok(())
    }
}

fn push_line<T: Serialize>(buf: &mut Vec<u8>, row: &T) -> Result<(), BackendError> {
    serde_json::to_writer(&mut *buf, row)?;
    buf.push(b'\n');
    Ok(())
}

impl ResultSink for JsonLinesSink {
    async fn write_scores(
        &self,
        viewer: UserId,
        matches: &[RankedMatch],
        computed_at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        let mut buf = Vec::new();
        for (i, m) in matches.iter().enumerate() {
            push_line(
                &mut buf,
                &ScoreRow {
                    job: JobName::MatchScores,
                    viewer,
                    candidate: m.candidate,
                    rank: i + 1,
                    final_score: m.score(),
                    components: &m.result.components,
                    meta: &m.result.meta,
                    computed_at,
                },
            )?;
        }
        self.append(&buf).await
    }

    async fn write_trait_profile(
        &self,
        profile: &TraitProfile,
        computed_at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        let mut buf = Vec::new();
        push_line(
            &mut buf,
            &ProfileRow {
                job: JobName::TraitProfiles,
                profile,
                computed_at,
            },
        )?;
        self.append(&buf).await
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MemorySink;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;

    use super::super::error::BackendError;
    use super::super::source::ResultSink;
    use super::super::types::TraitProfile;
    use crate::model::UserId;
    use crate::scoring::RankedMatch;

    /// Sink that keeps the latest rows per user in memory.
    #[derive(Debug, Default)]
    pub struct MemorySink {
        scores: Mutex<BTreeMap<UserId, Vec<RankedMatch>>>,
        profiles: Mutex<BTreeMap<UserId, TraitProfile>>,
        failing: Mutex<BTreeSet<UserId>>,
        writes: AtomicUsize,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every write for `id` fail.
        pub fn fail_for(&self, id: UserId) {
            self.failing.lock().insert(id);
        }

        pub fn scores_for(&self, viewer: UserId) -> Option<Vec<RankedMatch>> {
            self.scores.lock().get(&viewer).cloned()
        }

        pub fn profile_for(&self, id: UserId) -> Option<TraitProfile> {
            self.profiles.lock().get(&id).cloned()
        }

        pub fn viewers(&self) -> Vec<UserId> {
            self.scores.lock().keys().copied().collect()
        }

        /// Successful writes so far.
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn check(&self, id: UserId) -> Result<(), BackendError> {
            if self.failing.lock().contains(&id) {
                return Err(BackendError::Unavailable {
                    reason: format!("sink rejected write for user {id}"),
                });
            }
            Ok(())
        }
    }

    impl ResultSink for MemorySink {
        async fn write_scores(
            &self,
            viewer: UserId,
            matches: &[RankedMatch],
            _computed_at: DateTime<Utc>,
        ) -> Result<(), BackendError> {
            self.check(viewer)?;
            self.scores.lock().insert(viewer, matches.to_vec());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn write_trait_profile(
            &self,
            profile: &TraitProfile,
            _computed_at: DateTime<Utc>,
        ) -> Result<(), BackendError> {
            self.check(profile.user_id)?;
            self.profiles.lock().insert(profile.user_id, profile.clone());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
