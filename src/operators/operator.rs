use serde_json::{Value, json};

use super::context::MatchContext;
use super::types::{Evaluation, Signal, TraitSource};
use crate::constants::{
    INTEREST_NEUTRAL, PROXIMITY_NEUTRAL, RATING_BASELINE, RECENCY_NEUTRAL, TRAIT_NEUTRAL,
};
use crate::math::{age_days, clamp01, haversine_km, recency_decay};
use crate::signals::{
    cheap_interest_bound, interest_overlap, quiz_similarity, rating_fit, rating_quality,
    trait_similarity,
};

/// The closed set of scoring dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    InterestOverlap,
    TraitSimilarity,
    RatingQuality,
    RatingFit,
    Recency,
    Proximity,
}

/// Registration order; also the order components are summed in.
pub const OPERATORS: [Operator; 6] = [
    Operator::InterestOverlap,
    Operator::TraitSimilarity,
    Operator::RatingQuality,
    Operator::RatingFit,
    Operator::Recency,
    Operator::Proximity,
];

impl Operator {
    pub const fn key(self) -> &'static str {
        match self {
            Operator::InterestOverlap => "interest",
            Operator::TraitSimilarity => "trait",
            Operator::RatingQuality => "rating_quality",
            Operator::RatingFit => "rating_fit",
            Operator::Recency => "recency",
            Operator::Proximity => "proximity",
        }
    }

    /// Key looked up in [`crate::config::Preferences::weights`].
    pub const fn weight_key(self) -> &'static str {
        match self {
            Operator::InterestOverlap => "interests",
            Operator::TraitSimilarity => "traits",
            Operator::RatingQuality => "rating_quality",
            Operator::RatingFit => "rating_fit",
            Operator::Recency => "recency",
            Operator::Proximity => "proximity",
        }
    }

    /// Key under which the score and metadata appear in a score result.
    pub const fn component_key(self) -> &'static str {
        match self {
            Operator::InterestOverlap => "interestOverlap",
            Operator::TraitSimilarity => "traitSimilarity",
            Operator::RatingQuality => "ratingQuality",
            Operator::RatingFit => "ratingFit",
            Operator::Recency => "recency",
            Operator::Proximity => "proximity",
        }
    }

    /// Score substituted for [`Signal::Absent`].
    pub const fn neutral(self) -> f64 {
        match self {
            Operator::InterestOverlap => INTEREST_NEUTRAL,
            Operator::TraitSimilarity => TRAIT_NEUTRAL,
            Operator::RatingQuality | Operator::RatingFit => RATING_BASELINE,
            Operator::Recency => RECENCY_NEUTRAL,
            Operator::Proximity => PROXIMITY_NEUTRAL,
        }
    }

    /// Upper bound on [`Operator::score`], for operators that have a cheaper one.
    pub fn cheap(self, ctx: &MatchContext<'_>) -> Option<f64> {
        match self {
            Operator::InterestOverlap => {
                let (v, c) = (ctx.viewer.interests.len(), ctx.candidate.interests.len());
                if v == 0 || c == 0 {
                    Some(INTEREST_NEUTRAL)
                } else {
                    Some(cheap_interest_bound(v, c))
                }
            }
            _ => None,
        }
    }

    /// Full evaluation. Never fails: missing data yields [`Signal::Absent`].
    pub fn evaluate(self, ctx: &MatchContext<'_>) -> Evaluation {
        match self {
            Operator::InterestOverlap => interest(ctx),
            Operator::TraitSimilarity => traits(ctx),
            Operator::RatingQuality => quality(ctx),
            Operator::RatingFit => fit(ctx),
            Operator::Recency => recency(ctx),
            Operator::Proximity => proximity(ctx),
        }
    }

    /// Evaluated score collapsed to `[0, 1]`.
    #[inline]
    pub fn score(self, ctx: &MatchContext<'_>) -> f64 {
        self.evaluate(ctx).signal.resolve(self.neutral())
    }

    /// `cheap` if available, otherwise the full score.
    #[inline]
    pub fn upper_bound(self, ctx: &MatchContext<'_>) -> f64 {
        self.cheap(ctx).unwrap_or_else(|| self.score(ctx))
    }
}

fn to_meta<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn interest(ctx: &MatchContext<'_>) -> Evaluation {
    match interest_overlap(&ctx.viewer.interests, &ctx.candidate.interests) {
        Some(result) => Evaluation {
            signal: Signal::Computed(result.overlap),
            meta: to_meta(&result),
        },
        None => Evaluation {
            signal: Signal::Absent,
            meta: json!({
                "overlap": Value::Null,
                "viewerCount": ctx.viewer.interests.len(),
                "candidateCount": ctx.candidate.interests.len(),
            }),
        },
    }
}

/// Trait similarity, falling back to the legacy quiz, then to neutral.
fn traits(ctx: &MatchContext<'_>) -> Evaluation {
    let trait_result = match (&ctx.viewer.traits, &ctx.candidate.traits) {
        (Some(v), Some(c)) => Some(trait_similarity(v, c)),
        _ => None,
    };
    let usable = trait_result.filter(|t| t.common_count >= ctx.prefs.min_trait_overlap.max(1));

    if let Some(sim) = usable {
        return Evaluation {
            signal: Signal::Computed(sim.value),
            meta: json!({
                "source": TraitSource::Trait,
                "traitSim": sim.value,
                "coverage": sim.coverage,
                "commonCount": sim.common_count,
                "quizSimLegacy": Value::Null,
            }),
        };
    }

    let common_count = trait_result.map(|t| t.common_count);
    let quiz = match (&ctx.viewer.quiz, &ctx.candidate.quiz) {
        (Some(v), Some(c)) => quiz_similarity(v, c),
        _ => None,
    };

    match quiz {
        Some(q) => Evaluation {
            signal: Signal::Computed(q.value),
            meta: json!({
                "source": TraitSource::Quiz,
                "traitSim": Value::Null,
                "commonCount": common_count,
                "quizSimLegacy": q.value,
                "quizShared": q.shared,
            }),
        },
        None => Evaluation {
            signal: Signal::Absent,
            meta: json!({
                "source": TraitSource::Neutral,
                "traitSim": Value::Null,
                "commonCount": common_count,
                "quizSimLegacy": Value::Null,
            }),
        },
    }
}

fn quality(ctx: &MatchContext<'_>) -> Evaluation {
    let prefs = ctx.prefs;
    let count = ctx.candidate.ratings.map(|r| r.count).unwrap_or(0);
    match ctx
        .candidate
        .ratings
        .and_then(|r| rating_quality(&r, prefs.min_rating_count, prefs.rating_max))
    {
        Some(q) => Evaluation {
            signal: Signal::Computed(q.value),
            meta: to_meta(&q),
        },
        None => Evaluation {
            signal: Signal::Absent,
            meta: json!({ "count": count, "minCount": prefs.min_rating_count }),
        },
    }
}

fn fit(ctx: &MatchContext<'_>) -> Evaluation {
    let prefs = ctx.prefs;
    let result = match (ctx.viewer.ratings, ctx.candidate.ratings) {
        (Some(v), Some(c)) => rating_fit(&v, &c, prefs.min_rating_count, prefs.rating_max),
        _ => None,
    };
    match result {
        Some(f) => Evaluation {
            signal: Signal::Computed(f.value),
            meta: to_meta(&f),
        },
        None => Evaluation {
            signal: Signal::Absent,
            meta: json!({
                "viewerCount": ctx.viewer.ratings.map(|r| r.count).unwrap_or(0),
                "candidateCount": ctx.candidate.ratings.map(|r| r.count).unwrap_or(0),
                "minCount": prefs.min_rating_count,
            }),
        },
    }
}

fn recency(ctx: &MatchContext<'_>) -> Evaluation {
    let half_life = ctx.prefs.recency_half_life_days;
    match ctx.candidate.last_active() {
        Some(at) => {
            let age = age_days(at, ctx.now);
            Evaluation {
                signal: Signal::Computed(recency_decay(age, half_life)),
                meta: json!({ "ageDays": age, "halfLifeDays": half_life }),
            }
        }
        None => Evaluation {
            signal: Signal::Absent,
            meta: json!({ "ageDays": Value::Null, "halfLifeDays": half_life }),
        },
    }
}

fn proximity(ctx: &MatchContext<'_>) -> Evaluation {
    let scale = ctx.prefs.distance_scale_km;
    match (&ctx.viewer.location, &ctx.candidate.location) {
        (Some(v), Some(c)) => {
            let distance = haversine_km(v, c);
            let value = if scale > 0.0 {
                clamp01((-distance / scale).exp())
            } else {
                0.0
            };
            Evaluation {
                signal: Signal::Computed(value),
                meta: json!({ "distanceKm": distance, "scaleKm": scale }),
            }
        }
        _ => Evaluation {
            signal: Signal::Absent,
            meta: json!({ "distanceKm": Value::Null, "scaleKm": scale }),
        },
    }
}
