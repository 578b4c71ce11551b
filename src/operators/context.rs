use chrono::{DateTime, Utc};

use crate::config::Preferences;
use crate::model::FeatureBundle;

/// Per-pair inputs shared by every operator. Immutable once built.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub viewer: &'a FeatureBundle,
    pub candidate: &'a FeatureBundle,
    pub prefs: &'a Preferences,
    /// Reference instant for recency.
    pub now: DateTime<Utc>,
}

impl<'a> MatchContext<'a> {
    pub fn new(
        viewer: &'a FeatureBundle,
        candidate: &'a FeatureBundle,
        prefs: &'a Preferences,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            viewer,
            candidate,
            prefs,
            now,
        }
    }
}
