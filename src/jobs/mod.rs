//! Batch job driver.
//!
//! Jobs page over target users, consult the freshness cache per unit, and persist
//! results through a [`ResultSink`]. `match-scores` depends on `trait-profiles`;
//! [`JobDriver::run_group`] refuses groups listing them out of order.

pub mod driver;
pub mod error;
pub mod snapshot;
pub mod source;
pub mod types;

#[cfg(test)]
mod tests;

pub use driver::{JobDriver, validate_order};
pub use error::{BackendError, JobError, JobResult};
#[cfg(any(test, feature = "mock"))]
pub use snapshot::MemorySink;
pub use snapshot::{JsonLinesSink, SnapshotSource};
pub use source::{DataSource, ResultSink};
pub use types::{JOBS, JobFlags, JobName, JobReport, TraitProfile};
