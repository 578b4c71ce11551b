use serde::Serialize;

use crate::constants::RATING_PRIOR_COUNT;
use crate::math::{clamp01, mean};
use crate::model::RatingSummary;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingQuality {
    pub value: f64,
    /// Mean sub-rating divided by the scale maximum.
    pub base: f64,
    /// `count / (count + prior)`; approaches `1` as ratings accumulate.
    pub confidence: f64,
    pub count: u32,
}

/// Count-weighted average of the four received sub-ratings.
///
/// `None` when fewer than `min_count` ratings exist.
pub fn rating_quality(
    summary: &RatingSummary,
    min_count: u32,
    rating_max: u8,
) -> Option<RatingQuality> {
    if summary.count == 0 || summary.count < min_count || rating_max == 0 {
        return None;
    }

    let base = clamp01(mean(&summary.sub_ratings())? / f64::from(rating_max));
    let n = f64::from(summary.count);
    let confidence = n / (n + RATING_PRIOR_COUNT);

    Some(RatingQuality {
        value: clamp01(base * confidence),
        base,
        confidence,
        count: summary.count,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingFit {
    pub value: f64,
    /// Mean absolute gap between matching sub-ratings, in scale units.
    pub mean_gap: f64,
}

/// Closeness of the viewer's own rating profile to the candidate's.
///
/// Both sides must have at least `min_count` ratings.
pub fn rating_fit(
    viewer: &RatingSummary,
    candidate: &RatingSummary,
    min_count: u32,
    rating_max: u8,
) -> Option<RatingFit> {
    let gated = |s: &RatingSummary| s.count == 0 || s.count < min_count;
    if gated(viewer) || gated(candidate) || rating_max == 0 {
        return None;
    }

    let gaps: Vec<f64> = viewer
        .sub_ratings()
        .iter()
        .zip(candidate.sub_ratings())
        .map(|(v, c)| (v - c).abs())
        .collect();
    let mean_gap = mean(&gaps)?;

    Some(RatingFit {
        value: clamp01(1.0 - mean_gap / f64::from(rating_max)),
        mean_gap,
    })
}
