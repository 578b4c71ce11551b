use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::error::ScoringError;
use super::ranker::TopK;
use super::types::{RankedMatch, Ranking, ScoreResult};
use crate::config::Preferences;
use crate::math::clamp01;
use crate::model::FeatureBundle;
use crate::operators::{Evaluation, MatchContext, OPERATORS, Operator};

/// Upper bound for one pair plus the operator evaluations computed to reach it,
/// indexed like the engine's operator list.
#[derive(Debug)]
pub(crate) struct BoundPass {
    pub bound: f64,
    pub computed: Vec<Option<Evaluation>>,
}

/// Runs the registered operators over pairs and ranks candidate pools.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    prefs: Preferences,
    operators: &'static [Operator],
}

impl MatchEngine {
    /// Creates an engine over the full operator registry.
    pub fn new(prefs: Preferences) -> Result<Self, ScoringError> {
        prefs.validate()?;
        Ok(Self {
            prefs,
            operators: &OPERATORS,
        })
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn operators(&self) -> &'static [Operator] {
        self.operators
    }

    /// Builds the per-pair context.
    pub fn context<'a>(
        &'a self,
        viewer: &'a FeatureBundle,
        candidate: &'a FeatureBundle,
        now: DateTime<Utc>,
    ) -> MatchContext<'a> {
        MatchContext::new(viewer, candidate, &self.prefs, now)
    }

    /// Scores one pair. Every operator runs, including zero-weight ones.
    pub fn evaluate(&self, ctx: &MatchContext<'_>) -> ScoreResult {
        self.evaluate_reusing(ctx, Vec::new())
    }

    /// Like [`MatchEngine::evaluate`], taking evaluations already computed by
    /// [`MatchEngine::bound_pass`] instead of running those operators again.
    pub(crate) fn evaluate_reusing(
        &self,
        ctx: &MatchContext<'_>,
        computed: Vec<Option<Evaluation>>,
    ) -> ScoreResult {
        let mut components = BTreeMap::new();
        let mut meta = BTreeMap::new();
        let (mut weighted, mut total_weight) = (0.0, 0.0);
        let mut computed = computed.into_iter();

        for &op in self.operators {
            let evaluation = match computed.next().flatten() {
                Some(evaluation) => evaluation,
                None => op.evaluate(ctx),
            };
            let score = evaluation.signal.resolve(op.neutral());
            let weight = ctx.prefs.weight(op.weight_key());

            weighted += weight * score;
            total_weight += weight;
            components.insert(op.component_key(), score);
            meta.insert(op.component_key(), evaluation.meta);
        }

        ScoreResult {
            final_score: normalize(weighted, total_weight),
            components,
            meta,
        }
    }

    /// Upper bound on `evaluate(ctx).final_score`.
    ///
    /// Summed in the same order and with the same weights as [`MatchEngine::evaluate`],
    /// so the bound holds in floating point as well.
    pub fn upper_bound(&self, ctx: &MatchContext<'_>) -> f64 {
        self.bound_pass(ctx).bound
    }

    /// Computes the upper bound, keeping the full evaluations of operators that have
    /// no cheap bound so a surviving candidate does not run them twice.
    pub(crate) fn bound_pass(&self, ctx: &MatchContext<'_>) -> BoundPass {
        let mut computed = Vec::with_capacity(self.operators.len());
        let (mut weighted, mut total_weight) = (0.0, 0.0);

        for &op in self.operators {
            let bound = match op.cheap(ctx) {
                Some(bound) => {
                    computed.push(None);
                    bound
                }
                None => {
                    let evaluation = op.evaluate(ctx);
                    let score = evaluation.signal.resolve(op.neutral());
                    computed.push(Some(evaluation));
                    score
                }
            };
            let weight = ctx.prefs.weight(op.weight_key());
            weighted += weight * bound;
            total_weight += weight;
        }

        BoundPass {
            bound: normalize(weighted, total_weight),
            computed,
        }
    }

    /// Starts an incremental top-K ranking for `viewer`.
    pub fn ranker<'a>(
        &'a self,
        viewer: &'a FeatureBundle,
        now: DateTime<Utc>,
        top_k: usize,
    ) -> TopK<'a> {
        TopK::new(self, viewer, now, top_k)
    }

    /// Top `top_k` candidates for `viewer`, with cheap-bound pruning.
    pub fn rank(
        &self,
        viewer: &FeatureBundle,
        candidates: &[FeatureBundle],
        now: DateTime<Utc>,
        top_k: usize,
    ) -> Ranking {
        let mut ranker = self.ranker(viewer, now, top_k);
        ranker.offer_all(candidates);
        let ranking = ranker.finish();

        debug!(
            viewer = %viewer.id,
            candidates = candidates.len(),
            evaluated = ranking.evaluated,
            pruned = ranking.pruned,
            "Ranked candidate pool"
        );
        ranking
    }

    /// Reference ranking: evaluates every candidate and sorts.
    pub fn rank_exhaustive(
        &self,
        viewer: &FeatureBundle,
        candidates: &[FeatureBundle],
        now: DateTime<Utc>,
        top_k: usize,
    ) -> Vec<RankedMatch> {
        let mut all: Vec<RankedMatch> = candidates
            .iter()
            .filter(|c| c.id != viewer.id)
            .map(|c| RankedMatch {
                candidate: c.id,
                result: self.evaluate(&self.context(viewer, c, now)),
            })
            .collect();

        all.sort_by(compare_ranked);
        all.truncate(top_k);
        all
    }
}

/// Best first: higher score, then lower candidate id.
pub(crate) fn compare_ranked(a: &RankedMatch, b: &RankedMatch) -> Ordering {
    b.score()
        .total_cmp(&a.score())
        .then_with(|| a.candidate.cmp(&b.candidate))
}

#[inline]
fn normalize(weighted: f64, total_weight: f64) -> f64 {
    if total_weight > 0.0 {
        clamp01(weighted / total_weight)
    } else {
        0.0
    }
}
