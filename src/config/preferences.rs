//! Tunable scoring parameters, supplied per job run and immutable during it.

use std::collections::BTreeMap;
use std::env;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::constants::{
    DEFAULT_DISTANCE_SCALE_KM, DEFAULT_HALF_LIFE_DAYS, DEFAULT_MIN_RATING_COUNT,
    DEFAULT_MIN_TRAIT_OVERLAP, DEFAULT_RATING_MAX,
};
use crate::operators::OPERATORS;
use crate::scoring::ScoringError;

/// Default relative weights, keyed by operator weight key.
pub const DEFAULT_WEIGHTS: [(&str, f64); 6] = [
    ("interests", 0.30),
    ("traits", 0.30),
    ("rating_quality", 0.15),
    ("rating_fit", 0.10),
    ("recency", 0.10),
    ("proximity", 0.05),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Recency half-life. Default: `14.0` days.
    pub recency_half_life_days: f64,
    /// Shared trait dimensions required before trait similarity counts. Default: `3`.
    pub min_trait_overlap: usize,
    /// Ratings required before rating signals count. Default: `3`.
    pub min_rating_count: u32,
    /// Top of the rating scale. Default: `10`.
    pub rating_max: u8,
    /// Distance at which proximity falls to `1/e`. Default: `50.0` km.
    pub distance_scale_km: f64,
    /// Operator weight key -> non-negative relative weight. Unset keys weigh `0`.
    pub weights: BTreeMap<String, f64>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            recency_half_life_days: DEFAULT_HALF_LIFE_DAYS,
            min_trait_overlap: DEFAULT_MIN_TRAIT_OVERLAP,
            min_rating_count: DEFAULT_MIN_RATING_COUNT,
            rating_max: DEFAULT_RATING_MAX,
            distance_scale_km: DEFAULT_DISTANCE_SCALE_KM,
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(k, w)| (k.to_string(), *w))
                .collect(),
        }
    }
}

impl Preferences {
    const ENV_HALF_LIFE: &'static str = "AFFINITY_RECENCY_HALF_LIFE_DAYS";
    const ENV_MIN_TRAIT_OVERLAP: &'static str = "AFFINITY_MIN_TRAIT_OVERLAP";
    const ENV_MIN_RATING_COUNT: &'static str = "AFFINITY_MIN_RATING_COUNT";
    const ENV_RATING_MAX: &'static str = "AFFINITY_RATING_MAX";
    const ENV_DISTANCE_SCALE: &'static str = "AFFINITY_DISTANCE_SCALE_KM";
    const ENV_WEIGHTS: &'static str = "AFFINITY_WEIGHTS";

    /// Loads preferences from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let weights = match env::var(Self::ENV_WEIGHTS) {
            Ok(raw) if !raw.trim().is_empty() => Self::parse_weights(&raw)?,
            _ => defaults.weights,
        };

        Ok(Self {
            recency_half_life_days: parse_env(Self::ENV_HALF_LIFE, defaults.recency_half_life_days)?,
            min_trait_overlap: parse_env(Self::ENV_MIN_TRAIT_OVERLAP, defaults.min_trait_overlap)?,
            min_rating_count: parse_env(Self::ENV_MIN_RATING_COUNT, defaults.min_rating_count)?,
            rating_max: parse_env(Self::ENV_RATING_MAX, defaults.rating_max)?,
            distance_scale_km: parse_env(Self::ENV_DISTANCE_SCALE, defaults.distance_scale_km)?,
            weights,
        })
    }

    /// Parses `interests=0.3,traits=0.2` into a weight map.
    ///
    /// Keys must name a registered operator's weight key.
    pub fn parse_weights(raw: &str) -> Result<BTreeMap<String, f64>, ConfigError> {
        let mut weights = BTreeMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedWeight {
                    entry: entry.to_string(),
                })?;
            let key = key.trim();
            if !OPERATORS.iter().any(|op| op.weight_key() == key) {
                return Err(ConfigError::UnknownWeightKey {
                    key: key.to_string(),
                });
            }
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::MalformedWeight {
                    entry: entry.to_string(),
                })?;
            weights.insert(key.to_string(), value);
        }
        Ok(weights)
    }

    /// Returns the configured weight, `0.0` when unset.
    #[inline]
    pub fn weight(&self, key: &str) -> f64 {
        self.weights.get(key).copied().unwrap_or(0.0)
    }

    /// Replaces a single weight.
    pub fn with_weight(mut self, key: &str, weight: f64) -> Self {
        self.weights.insert(key.to_string(), weight);
        self
    }

    /// Replaces every weight with `weight`.
    pub fn with_uniform_weights(mut self, weight: f64) -> Self {
        for op in OPERATORS {
            self.weights.insert(op.weight_key().to_string(), weight);
        }
        self
    }

    /// Checks ranges the scoring functions rely on.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if let Some((key, w)) = self
            .weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(ScoringError::InvalidPreferences {
                reason: format!("weight '{key}' must be a non-negative finite number, got {w}"),
            });
        }
        if !(self.recency_half_life_days.is_finite() && self.recency_half_life_days > 0.0) {
            return Err(ScoringError::InvalidPreferences {
                reason: format!(
                    "recency half-life must be positive, got {}",
                    self.recency_half_life_days
                ),
            });
        }
        if !(self.distance_scale_km.is_finite() && self.distance_scale_km > 0.0) {
            return Err(ScoringError::InvalidPreferences {
                reason: format!(
                    "distance scale must be positive, got {}",
                    self.distance_scale_km
                ),
            });
        }
        if self.rating_max < 1 {
            return Err(ScoringError::InvalidPreferences {
                reason: "rating max must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        _ => Ok(default),
    }
}
