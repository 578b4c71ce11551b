use thiserror::Error;

/// Validation failures at scoring and rating entry points.
///
/// Missing feature data is never an error; it is scored with a neutral baseline.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("rating {value} is outside 1..={max}")]
    InvalidRating { value: u8, max: u8 },

    #[error("rating count is already at its maximum")]
    RatingCountOverflow,

    #[error("invalid preferences: {reason}")]
    InvalidPreferences { reason: String },
}
