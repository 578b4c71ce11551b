use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Clamps to `[0, 1]`. `NaN` maps to `0`.
#[inline]
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Exponential half-life decay: `exp(-ln(2) / half_life_days * age_days)`.
///
/// Ages at or below zero score exactly `1.0`. A non-positive half-life decays
/// everything older than "now" to zero.
pub fn recency_decay(age_days: f64, half_life_days: f64) -> f64 {
    if age_days.is_nan() {
        return 0.0;
    }
    if age_days <= 0.0 {
        return 1.0;
    }
    if half_life_days <= 0.0 || !half_life_days.is_finite() {
        return 0.0;
    }

    let rate = std::f64::consts::LN_2 / half_life_days;
    clamp01((-rate * age_days).exp())
}

/// Fractional days elapsed from `from` to `now`. Negative if `from` is in the future.
pub fn age_days(from: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let elapsed = now.signed_duration_since(from);
    elapsed.num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
