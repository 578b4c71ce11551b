use std::collections::BTreeSet;

use serde::Serialize;

use crate::constants::MAX_SHARED_INTERESTS;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestOverlap {
    /// Jaccard overlap `|A ∩ B| / |A ∪ B|`.
    pub overlap: f64,
    /// First few shared tags, in sorted order.
    pub shared: Vec<String>,
    pub viewer_count: usize,
    pub candidate_count: usize,
}

/// Jaccard overlap of two tag sets. `None` if either set is empty.
pub fn interest_overlap(
    viewer: &BTreeSet<String>,
    candidate: &BTreeSet<String>,
) -> Option<InterestOverlap> {
    if viewer.is_empty() || candidate.is_empty() {
        return None;
    }

    let intersection: Vec<&String> = viewer.intersection(candidate).collect();
    let union = viewer.len() + candidate.len() - intersection.len();

    Some(InterestOverlap {
        overlap: intersection.len() as f64 / union as f64,
        shared: intersection
            .into_iter()
            .take(MAX_SHARED_INTERESTS)
            .cloned()
            .collect(),
        viewer_count: viewer.len(),
        candidate_count: candidate.len(),
    })
}

/// Upper bound on [`interest_overlap`] from set sizes alone.
///
/// `|A ∩ B| <= min(|A|, |B|)` and `|A ∪ B| >= max(|A|, |B|)`, so the ratio never
/// understates the Jaccard overlap.
#[inline]
pub fn cheap_interest_bound(viewer_len: usize, candidate_len: usize) -> f64 {
    let denominator = viewer_len.max(candidate_len).max(1);
    viewer_len.min(candidate_len) as f64 / denominator as f64
}
