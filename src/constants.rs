//! Cross-cutting, shared constants.
//!
//! Neutral baselines are part of the scoring contract: they are substituted when a
//! dimension's inputs are absent and must stay distinct from a computed zero.
//!
//! # Baselines
//!
//! | Dimension          | Baseline | Meaning                                   |
//! |--------------------|----------|-------------------------------------------|
//! | interest overlap   | `0.1`    | no tags on one side, above known-disjoint |
//! | trait similarity   | `0.5`    | nothing comparable, maximally uncertain   |
//! | rating quality/fit | `0.0`    | too few ratings to trust                  |
//! | recency/proximity  | `0.5`    | timestamps or coordinates missing         |

pub const INTEREST_NEUTRAL: f64 = 0.1;
pub const TRAIT_NEUTRAL: f64 = 0.5;
pub const RATING_BASELINE: f64 = 0.0;
pub const RECENCY_NEUTRAL: f64 = 0.5;
pub const PROXIMITY_NEUTRAL: f64 = 0.5;

/// Shared interests reported in diagnostics.
pub const MAX_SHARED_INTERESTS: usize = 5;

/// Pseudo-count that shrinks rating quality toward zero for thin histories.
pub const RATING_PRIOR_COUNT: f64 = 5.0;

pub const DEFAULT_HALF_LIFE_DAYS: f64 = 14.0;
pub const DEFAULT_MIN_TRAIT_OVERLAP: usize = 3;
pub const DEFAULT_MIN_RATING_COUNT: u32 = 3;
pub const DEFAULT_RATING_MAX: u8 = 10;
pub const DEFAULT_DISTANCE_SCALE_KM: f64 = 50.0;

pub const DEFAULT_ALGORITHM_VERSION: &str = "v1";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_CANDIDATE_BATCH_SIZE: usize = 500;
pub const DEFAULT_TOP_K: usize = 50;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Length of a hex-encoded BLAKE3 input hash.
pub const INPUT_HASH_HEX_LEN: usize = 64;
