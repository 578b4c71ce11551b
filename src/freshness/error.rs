use thiserror::Error;

use crate::hashing::HashError;

#[derive(Debug, Error)]
/// Errors returned by a [`super::FreshnessStore`].
pub enum StoreError {
    /// Store not provisioned or unreachable. Recovered by failing open.
    #[error("freshness store unavailable: {reason}")]
    Unavailable {
        /// Why the store could not be reached.
        reason: String,
    },

    /// Filesystem error.
    #[error("freshness store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored records could not be (de)serialized.
    #[error("freshness store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend failure.
    #[error("freshness store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

#[derive(Debug, Error)]
/// Errors surfaced by the [`super::FreshnessCache`].
///
/// Never carries [`StoreError::Unavailable`]; that case is absorbed by the cache.
pub enum FreshnessError {
    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Hash(#[from] HashError),
}
