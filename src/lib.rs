//! Affinity library crate (used by the job binary, benches and integration tests).
//!
//! # Public API Surface
//!
//! ## Scoring
//! - [`FeatureBundle`], [`UserId`] - Per-user features from the data-access layer
//! - [`Preferences`] - Weights and thresholds for one run
//! - [`Operator`], [`OPERATORS`], [`Signal`] - The closed operator registry
//! - [`MatchEngine`], [`ScoreResult`], [`Ranking`] - Weighted aggregation and top-K ranking
//!
//! ## Freshness
//! - [`FreshnessCache`], [`FreshnessStore`] - Skip units whose inputs are unchanged
//! - [`InputHasher`] - Canonical BLAKE3 input digests
//!
//! ## Jobs
//! - [`JobDriver`], [`JobName`], [`JobFlags`], [`JobReport`] - Batch execution
//! - [`DataSource`], [`ResultSink`] - Data-access seams
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod freshness;
pub mod hashing;
pub mod jobs;
pub mod math;
pub mod model;
pub mod operators;
pub mod scoring;
pub mod signals;

pub use config::{Config, ConfigError, DEFAULT_WEIGHTS, Preferences};
pub use freshness::{
    FreshnessCache, FreshnessError, FreshnessRecord, FreshnessStore, InMemoryFreshnessStore,
    JsonFileFreshnessStore, StoreError,
};
pub use hashing::{HashError, InputHasher, input_hash};
#[cfg(any(test, feature = "mock"))]
pub use jobs::MemorySink;
pub use jobs::{
    BackendError, DataSource, JOBS, JobDriver, JobError, JobFlags, JobName, JobReport,
    JsonLinesSink, ResultSink, SnapshotSource, TraitProfile,
};
pub use model::{
    FeatureBundle, GeoPoint, QuizAnswers, RatingInput, RatingSummary, TraitVector, UserId,
};
pub use operators::{MatchContext, OPERATORS, Operator, Signal};
pub use scoring::{MatchEngine, RankedMatch, Ranking, ScoreResult, ScoringError, TopK};
