use std::future::Future;

use chrono::{DateTime, Utc};

use super::error::BackendError;
use super::types::TraitProfile;
use crate::model::{FeatureBundle, UserId};
use crate::scoring::RankedMatch;

/// Read side of the data-access layer.
///
/// Pages use keyset pagination: ids strictly greater than `after`, ascending.
pub trait DataSource: Send + Sync {
    /// Ids of users a job should process.
    fn target_ids(
        &self,
        after: Option<UserId>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<UserId>, BackendError>> + Send;

    fn feature_bundle(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<FeatureBundle>, BackendError>> + Send;

    /// Candidates for `viewer`. May or may not include the viewer itself.
    fn candidate_page(
        &self,
        viewer: UserId,
        after: Option<UserId>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<FeatureBundle>, BackendError>> + Send;
}

/// Write side of the data-access layer.
pub trait ResultSink: Send + Sync {
    /// Persists a viewer's ranked matches, best first.
    fn write_scores(
        &self,
        viewer: UserId,
        matches: &[RankedMatch],
        computed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn write_trait_profile(
        &self,
        profile: &TraitProfile,
        computed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}
