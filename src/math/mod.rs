//! Pure numeric helpers shared by the scoring functions.

pub mod geo;
pub mod stats;

pub use geo::{EARTH_RADIUS_KM, haversine_km};
pub use stats::{age_days, clamp01, mean, recency_decay};
