use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};

use super::engine::MatchEngine;
use super::types::{RankedMatch, Ranking};
use crate::model::{FeatureBundle, UserId};

/// Heap entry ordered so the *worst* retained match sits on top.
#[derive(Debug)]
struct Slot(RankedMatch);

impl Slot {
    fn key(&self) -> (f64, UserId) {
        (self.0.score(), self.0.candidate)
    }
}

/// `Greater` means worse: lower score, or equal score and higher id.
fn worse(a: (f64, UserId), b: (f64, UserId)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1))
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        worse(self.key(), other.key())
    }
}

/// Incremental top-K over a stream of candidate pages.
///
/// A candidate is fully evaluated only if its upper bound, paired with its id, would
/// sort ahead of the current K-th entry. Ties on the bound are evaluated because they
/// can still win on id.
pub struct TopK<'a> {
    engine: &'a MatchEngine,
    viewer: &'a FeatureBundle,
    now: DateTime<Utc>,
    k: usize,
    heap: BinaryHeap<Slot>,
    evaluated: usize,
    pruned: usize,
}

impl<'a> TopK<'a> {
    pub(crate) fn new(
        engine: &'a MatchEngine,
        viewer: &'a FeatureBundle,
        now: DateTime<Utc>,
        k: usize,
    ) -> Self {
        Self {
            engine,
            viewer,
            now,
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(4096)),
            evaluated: 0,
            pruned: 0,
        }
    }

    /// Considers one candidate. The viewer itself is ignored.
    pub fn offer(&mut self, candidate: &FeatureBundle) {
        if self.k == 0 || candidate.id == self.viewer.id {
            return;
        }

        let ctx = self.engine.context(self.viewer, candidate, self.now);

        let mut computed = Vec::new();
        if self.heap.len() >= self.k {
            if let Some(kth) = self.heap.peek() {
                let pass = self.engine.bound_pass(&ctx);
                if worse((pass.bound, candidate.id), kth.key()) != Ordering::Less {
                    self.pruned += 1;
                    return;
                }
                computed = pass.computed;
            }
        }

        let slot = Slot(RankedMatch {
            candidate: candidate.id,
            result: self.engine.evaluate_reusing(&ctx, computed),
        });
        self.evaluated += 1;

        if self.heap.len() < self.k {
            self.heap.push(slot);
        } else if let Some(mut kth) = self.heap.peek_mut() {
            if slot < *kth {
                *kth = slot;
            }
        }
    }

    pub fn offer_all<'b>(&mut self, candidates: impl IntoIterator<Item = &'b FeatureBundle>) {
        for candidate in candidates {
            self.offer(candidate);
        }
    }

    /// Number of matches currently retained.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Matches best first.
    pub fn finish(self) -> Ranking {
        Ranking {
            matches: self
                .heap
                .into_sorted_vec()
                .into_iter()
                .map(|slot| slot.0)
                .collect(),
            evaluated: self.evaluated,
            pruned: self.pruned,
        }
    }
}
