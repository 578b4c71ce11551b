//! Per-dimension scoring functions.
//!
//! Each function turns raw feature data into a normalized value plus diagnostics, or
//! `None` when its inputs are unusable. Substituting neutral baselines for `None` is
//! the operator's job (see [`crate::operators`]), never the function's.

pub mod interests;
pub mod ratings;
pub mod traits;


pub use interests::{InterestOverlap, cheap_interest_bound, interest_overlap};
pub use ratings::{RatingFit, RatingQuality, rating_fit, rating_quality};
pub use traits::{QuizSimilarity, TraitSimilarity, quiz_similarity, trait_similarity};
