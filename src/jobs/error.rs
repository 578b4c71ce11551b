use thiserror::Error;

use super::types::JobName;
use crate::config::ConfigError;
use crate::freshness::FreshnessError;
use crate::hashing::HashError;
use crate::model::UserId;
use crate::scoring::ScoringError;

#[derive(Debug, Error)]
/// Failures of a data source or result sink.
pub enum BackendError {
    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend unavailable: {reason}")]
    Unavailable { reason: String },
}

#[derive(Debug, Error)]
/// Errors returned by the [`super::JobDriver`].
pub enum JobError {
    /// Malformed flags or preferences. Not retried.
    #[error("invalid job input: {reason}")]
    Validation { reason: String },

    /// Referenced user does not exist in the data source.
    #[error("user {id} not found")]
    NotFound { id: UserId },

    /// A job group lists a job before one of its declared dependencies.
    #[error("job '{job}' must run after its dependency '{dependency}'")]
    DependencyOrder { job: JobName, dependency: JobName },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Freshness(#[from] FreshnessError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ScoringError> for JobError {
    fn from(err: ScoringError) -> Self {
        JobError::Validation {
            reason: err.to_string(),
        }
    }
}

impl From<HashError> for JobError {
    fn from(err: HashError) -> Self {
        JobError::Freshness(FreshnessError::Hash(err))
    }
}

pub type JobResult<T> = Result<T, JobError>;
