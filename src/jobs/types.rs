use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::{FeatureBundle, UserId};

/// Batch jobs known to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobName {
    /// Derives per-user trait profiles.
    TraitProfiles,
    /// Ranks candidates for each viewer and persists the top K.
    MatchScores,
}

pub const JOBS: [JobName; 2] = [JobName::TraitProfiles, JobName::MatchScores];

impl JobName {
    pub const fn as_str(self) -> &'static str {
        match self {
            JobName::TraitProfiles => "trait-profiles",
            JobName::MatchScores => "match-scores",
        }
    }

    /// Jobs that must complete before this one runs.
    ///
    /// The ordering is declarative: [`JobDriver::run_group`](super::JobDriver::run_group)
    /// refuses groups that list a job ahead of its dependency, but `match-scores` reads
    /// trait vectors from the feature bundles, not the persisted [`TraitProfile`] rows,
    /// so its output does not change with whether `trait-profiles` ran first.
    pub const fn depends_on(self) -> &'static [JobName] {
        match self {
            JobName::TraitProfiles => &[],
            JobName::MatchScores => &[JobName::TraitProfiles],
        }
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JOBS.into_iter()
            .find(|job| job.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<_> = JOBS.iter().map(|j| j.as_str()).collect();
                format!("unknown job '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Per-invocation overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFlags {
    /// Restrict the run to a single target.
    pub user_id: Option<UserId>,
    pub batch_size: usize,
    pub candidate_batch_size: usize,
    pub pause: Duration,
    pub top_k: usize,
    /// Ignore stored freshness for this run.
    pub full_refresh: bool,
}

impl JobFlags {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_id: None,
            batch_size: config.batch_size,
            candidate_batch_size: config.candidate_batch_size,
            pause: config.pause,
            top_k: config.top_k,
            full_refresh: false,
        }
    }
}

impl Default for JobFlags {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Outcome counts for one job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub processed: usize,
    pub skipped_fresh: usize,
    pub failed: usize,
    pub batches: usize,
    /// Stopped early by the shutdown flag.
    pub cancelled: bool,
}

/// Summary of a user's trait vector, persisted by the trait-profile job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitProfile {
    pub user_id: UserId,
    pub dimensions: usize,
    pub answered: usize,
    /// `answered / dimensions`, `0` when there are no dimensions.
    pub coverage: f64,
    /// Euclidean norm over answered dimensions.
    pub norm: f64,
}

impl TraitProfile {
    pub fn from_bundle(bundle: &FeatureBundle) -> Self {
        let (dimensions, answered, norm) = match &bundle.traits {
            Some(traits) => {
                let squares: f64 = (0..traits.dimensions())
                    .filter_map(|i| traits.get(i))
                    .map(|v| v * v)
                    .sum();
                (traits.dimensions(), traits.answered(), squares.sqrt())
            }
            None => (0, 0, 0.0),
        };
        let coverage = if dimensions == 0 {
            0.0
        } else {
            answered as f64 / dimensions as f64
        };
        Self {
            user_id: bundle.id,
            dimensions,
            answered,
            coverage,
            norm,
        }
    }
}
