//! Test fixtures for integration tests.

use std::path::{Path, PathBuf};

use affinity::{FeatureBundle, RatingSummary, TraitVector};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub const FIXED_TIMESTAMP: i64 = 1717200000;

pub const TAGS: [&str; 8] = [
    "hiking", "jazz", "chess", "cooking", "film", "running", "travel", "books",
];

pub fn fixed_now() -> DateTime<Utc> {
    Utc.timestamp_opt(FIXED_TIMESTAMP, 0).unwrap()
}

/// Deterministic mix of complete and sparse bundles with ids `1..=size`.
pub fn population(size: u64) -> Vec<FeatureBundle> {
    (1..=size).map(member).collect()
}

pub fn member(id: u64) -> FeatureBundle {
    let i = id as usize;
    let mut bundle = FeatureBundle::new(id)
        .with_interests((0..1 + i % 4).map(|t| TAGS[(i + t * 3) % TAGS.len()]));

    if i % 3 != 0 {
        bundle = bundle.with_traits(TraitVector::dense(
            (0..5).map(|d| (((i * 7 + d * 13) % 20) as f64 / 10.0) - 1.0),
        ));
    } else {
        bundle = bundle.with_quiz((0..6).map(|q| Some(((i + q) % 3) as u8)).collect());
    }
    if i % 2 == 0 {
        bundle = bundle.with_ratings(RatingSummary::new(
            [5.0 + (i % 5) as f64, 7.0, 6.0, 8.0 - (i % 3) as f64],
            (i % 12) as u32,
        ));
    }
    if i % 4 != 1 {
        bundle = bundle.with_location(35.6 + (i % 10) as f64 / 20.0, 139.7);
    }
    bundle.with_timestamps(
        Some(fixed_now() - Duration::days(200)),
        Some(fixed_now() - Duration::days((i * 5 % 60) as i64)),
    )
}

/// Writes `bundles` as a JSON array snapshot under `dir`.
pub fn write_snapshot(dir: &Path, bundles: &[FeatureBundle]) -> PathBuf {
    let path = dir.join("bundles.json");
    std::fs::write(&path, serde_json::to_vec_pretty(bundles).unwrap()).unwrap();
    path
}
