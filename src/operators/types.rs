use serde::Serialize;
use serde_json::Value;

use crate::math::clamp01;

/// Outcome of one operator before neutral substitution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// A value was computed from real data (zero included).
    Computed(f64),
    /// Inputs were missing or below a reliability threshold.
    Absent,
}

impl Signal {
    /// Collapses to a plain score in `[0, 1]`, using `neutral` for [`Signal::Absent`].
    #[inline]
    pub fn resolve(self, neutral: f64) -> f64 {
        match self {
            Signal::Computed(value) => clamp01(value),
            Signal::Absent => clamp01(neutral),
        }
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Signal::Absent)
    }

    pub fn computed(&self) -> Option<f64> {
        match self {
            Signal::Computed(value) => Some(*value),
            Signal::Absent => None,
        }
    }
}

/// Signal plus diagnostic metadata for one operator run.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub signal: Signal,
    pub meta: Value,
}

/// Which branch of the trait fallback chain produced the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitSource {
    Trait,
    Quiz,
    Neutral,
}
