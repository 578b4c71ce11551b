//! Feature bundles consumed from the data-access layer.
//!
//! Everything except the identifier is optional: absence is meaningful and is scored
//! with a documented neutral baseline rather than as zero.

pub mod bundle;
pub mod ratings;

#[cfg(test)]
mod tests;

pub use bundle::{FeatureBundle, GeoPoint, QuizAnswers, TraitVector, UserId};
pub use ratings::{RatingInput, RatingSummary};
