use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::model::UserId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Weighted score for one (viewer, candidate) pair.
pub struct ScoreResult {
    /// Weighted mean of component scores, in `[0, 1]`.
    pub final_score: f64,
    /// Component key -> resolved operator score.
    pub components: BTreeMap<&'static str, f64>,
    /// Component key -> operator diagnostics.
    pub meta: BTreeMap<&'static str, Value>,
}

impl ScoreResult {
    pub fn component(&self, key: &str) -> Option<f64> {
        self.components.get(key).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// One ranked candidate.
pub struct RankedMatch {
    pub candidate: UserId,
    pub result: ScoreResult,
}

impl RankedMatch {
    #[inline]
    pub fn score(&self) -> f64 {
        self.result.final_score
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Top-K matches plus pruning statistics.
pub struct Ranking {
    /// Best first; equal scores ordered by ascending candidate id.
    pub matches: Vec<RankedMatch>,
    /// Candidates fully evaluated.
    pub evaluated: usize,
    /// Candidates skipped because their upper bound could not enter the top K.
    pub pruned: usize,
}
