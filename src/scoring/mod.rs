//! Weighted aggregation and bounded top-K ranking.
//!
//! [`MatchEngine::evaluate`] runs every registered operator, weights each resolved
//! score by `prefs.weights[weight_key]` and divides by the total weight applied.
//! [`MatchEngine::rank`] keeps a bounded heap of the best K results and skips full
//! evaluation for candidates whose upper bound (cheap bounds where available, full
//! scores otherwise) cannot displace the current K-th entry.

pub mod engine;
pub mod error;
pub mod ranker;
pub mod types;


pub use engine::MatchEngine;
pub use error::ScoringError;
pub use ranker::TopK;
pub use types::{RankedMatch, Ranking, ScoreResult};
