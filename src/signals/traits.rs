use serde::Serialize;

use crate::math::clamp01;
use crate::model::{QuizAnswers, TraitVector};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitSimilarity {
    /// Cosine similarity over shared dimensions, rescaled from `[-1, 1]` to `[0, 1]`.
    pub value: f64,
    /// Shared dimensions as a fraction of the longer vector.
    pub coverage: f64,
    pub common_count: usize,
}

/// Cosine similarity over the dimensions both vectors answered.
///
/// Callers must treat the result as absent when `common_count` is below their
/// minimum overlap; this function reports it either way.
pub fn trait_similarity(viewer: &TraitVector, candidate: &TraitVector) -> TraitSimilarity {
    let longest = viewer.dimensions().max(candidate.dimensions());

    let (mut dot, mut norm_v, mut norm_c, mut common) = (0.0, 0.0, 0.0, 0usize);
    for i in 0..viewer.dimensions().min(candidate.dimensions()) {
        if let (Some(v), Some(c)) = (viewer.get(i), candidate.get(i)) {
            dot += v * c;
            norm_v += v * v;
            norm_c += c * c;
            common += 1;
        }
    }

    let cosine = if norm_v > 0.0 && norm_c > 0.0 {
        (dot / (norm_v.sqrt() * norm_c.sqrt())).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    TraitSimilarity {
        value: clamp01((cosine + 1.0) / 2.0),
        coverage: if longest == 0 {
            0.0
        } else {
            common as f64 / longest as f64
        },
        common_count: common,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSimilarity {
    /// Fraction of shared questions answered identically.
    pub value: f64,
    pub shared: usize,
}

/// Legacy quiz agreement. `None` when no question was answered by both sides.
pub fn quiz_similarity(viewer: &QuizAnswers, candidate: &QuizAnswers) -> Option<QuizSimilarity> {
    let (shared, agreed) = (0..viewer.len().min(candidate.len()))
        .filter_map(|i| Some((viewer.get(i)?, candidate.get(i)?)))
        .fold((0usize, 0usize), |(shared, agreed), (v, c)| {
            (shared + 1, agreed + usize::from(v == c))
        });

    if shared == 0 {
        return None;
    }

    Some(QuizSimilarity {
        value: agreed as f64 / shared as f64,
        shared,
    })
}
