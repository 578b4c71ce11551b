//! Freshness-gated recomputation.
//!
//! Each unit of work is keyed by `(job_name, scope)`. After a successful run the
//! driver records the input hash; later runs skip the unit while the hash matches.

pub mod cache;
pub mod error;
pub mod store;
pub mod types;


pub use cache::FreshnessCache;
pub use error::{FreshnessError, StoreError};
pub use store::{FreshnessStore, InMemoryFreshnessStore, JsonFileFreshnessStore};
pub use types::FreshnessRecord;
