use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ratings::RatingSummary;

/// Stable user identifier; also the ranking tie-breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// WGS84 coordinates in degrees.
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Ordered personality-trait dimensions. `None` marks an unanswered dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitVector {
    values: Vec<Option<f64>>,
}

impl TraitVector {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    /// Builds a fully answered vector.
    pub fn dense(values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(values.into_iter().map(Some).collect())
    }

    /// Total number of dimensions, answered or not.
    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    /// Coverage count: dimensions carrying a finite value.
    pub fn answered(&self) -> usize {
        self.values
            .iter()
            .filter(|v| v.is_some_and(f64::is_finite))
            .count()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    pub fn is_empty(&self) -> bool {
        self.answered() == 0
    }
}

/// Legacy quiz: one categorical choice per question, `None` when skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizAnswers(pub Vec<Option<u8>>);

impl QuizAnswers {
    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

/// Per-user features as returned by the data source. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBundle {
    pub id: UserId,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default)]
    pub traits: Option<TraitVector>,
    #[serde(default)]
    pub quiz: Option<QuizAnswers>,
    #[serde(default)]
    pub ratings: Option<RatingSummary>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FeatureBundle {
    /// A bundle carrying only an identifier.
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            interests: BTreeSet::new(),
            traits: None,
            quiz: None,
            ratings: None,
            location: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = interests.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_traits(mut self, traits: TraitVector) -> Self {
        self.traits = Some(traits);
        self
    }

    pub fn with_quiz(mut self, answers: Vec<Option<u8>>) -> Self {
        self.quiz = Some(QuizAnswers(answers));
        self
    }

    pub fn with_ratings(mut self, ratings: RatingSummary) -> Self {
        self.ratings = Some(ratings);
        self
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some(GeoPoint { lat, lon });
        self
    }

    pub fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    /// Most recent activity marker: `updated_at`, else `created_at`.
    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}
