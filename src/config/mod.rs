//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `AFFINITY_*` environment variables;
//! job CLI flags override these again for a single run.

pub mod error;
pub mod preferences;


pub use error::ConfigError;
pub use preferences::{DEFAULT_WEIGHTS, Preferences};

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ALGORITHM_VERSION, DEFAULT_BATCH_SIZE, DEFAULT_CANDIDATE_BATCH_SIZE,
    DEFAULT_MAX_CONCURRENCY, DEFAULT_TOP_K,
};
use preferences::parse_env;

/// Job-runner configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `AFFINITY_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Algorithm identifier mixed into every input hash. Default: `v1`.
    pub algorithm_version: String,

    /// Global full-recompute override. Set by either `AFFINITY_FULL_RECOMPUTE`
    /// or `AFFINITY_CACHE_BUST`.
    pub full_recompute: bool,

    /// Feature-bundle snapshot read by the binary. Default: `./.data/bundles.json`.
    pub data_path: PathBuf,

    /// JSON-lines result output. Default: `./.data/results.jsonl`.
    pub output_path: PathBuf,

    /// Freshness record file. Default: `./.data/freshness.json`.
    pub freshness_path: PathBuf,

    /// Targets per batch. Default: `100`.
    pub batch_size: usize,

    /// Candidates per page. Default: `500`.
    pub candidate_batch_size: usize,

    /// Sleep between batches. Default: none.
    pub pause: Duration,

    /// Matches kept per viewer. Default: `50`.
    pub top_k: usize,

    /// Units evaluated concurrently within a batch. Default: `4`.
    pub max_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm_version: DEFAULT_ALGORITHM_VERSION.to_string(),
            full_recompute: false,
            data_path: PathBuf::from("./.data/bundles.json"),
            output_path: PathBuf::from("./.data/results.jsonl"),
            freshness_path: PathBuf::from("./.data/freshness.json"),
            batch_size: DEFAULT_BATCH_SIZE,
            candidate_batch_size: DEFAULT_CANDIDATE_BATCH_SIZE,
            pause: Duration::ZERO,
            top_k: DEFAULT_TOP_K,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl Config {
    const ENV_ALGORITHM_VERSION: &'static str = "AFFINITY_ALGORITHM_VERSION";
    pub const ENV_FULL_RECOMPUTE: &'static str = "AFFINITY_FULL_RECOMPUTE";
    pub const ENV_CACHE_BUST: &'static str = "AFFINITY_CACHE_BUST";
    const ENV_DATA_PATH: &'static str = "AFFINITY_DATA_PATH";
    const ENV_OUTPUT_PATH: &'static str = "AFFINITY_OUTPUT_PATH";
    const ENV_FRESHNESS_PATH: &'static str = "AFFINITY_FRESHNESS_PATH";
    const ENV_BATCH_SIZE: &'static str = "AFFINITY_BATCH_SIZE";
    const ENV_CANDIDATE_BATCH_SIZE: &'static str = "AFFINITY_CANDIDATE_BATCH_SIZE";
    const ENV_PAUSE_MS: &'static str = "AFFINITY_PAUSE_MS";
    const ENV_TOP_K: &'static str = "AFFINITY_TOP_K";
    const ENV_MAX_CONCURRENCY: &'static str = "AFFINITY_MAX_CONCURRENCY";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let algorithm_version =
            Self::parse_string_from_env(Self::ENV_ALGORITHM_VERSION, defaults.algorithm_version);
        let full_recompute = Self::full_recompute_requested();
        let data_path = Self::parse_path_from_env(Self::ENV_DATA_PATH, defaults.data_path);
        let output_path = Self::parse_path_from_env(Self::ENV_OUTPUT_PATH, defaults.output_path);
        let freshness_path =
            Self::parse_path_from_env(Self::ENV_FRESHNESS_PATH, defaults.freshness_path);
        let batch_size = parse_env(Self::ENV_BATCH_SIZE, defaults.batch_size)?;
        let candidate_batch_size =
            parse_env(Self::ENV_CANDIDATE_BATCH_SIZE, defaults.candidate_batch_size)?;
        let pause = Duration::from_millis(parse_env(Self::ENV_PAUSE_MS, 0u64)?);
        let top_k = parse_env(Self::ENV_TOP_K, defaults.top_k)?;
        let max_concurrency = parse_env(Self::ENV_MAX_CONCURRENCY, defaults.max_concurrency)?;

        Ok(Self {
            algorithm_version,
            full_recompute,
            data_path,
            output_path,
            freshness_path,
            batch_size,
            candidate_batch_size,
            pause,
            top_k,
            max_concurrency,
        })
    }

    /// Returns `true` if either recompute switch is set to a truthy value.
    pub fn full_recompute_requested() -> bool {
        [Self::ENV_FULL_RECOMPUTE, Self::ENV_CACHE_BUST]
            .iter()
            .any(|name| env::var(name).map(|v| is_truthy(&v)).unwrap_or(false))
    }

    /// Validates basic invariants (does not touch the filesystem beyond `stat`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.algorithm_version.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_ALGORITHM_VERSION,
                reason: "must not be empty".to_string(),
            });
        }

        for (name, value) in [
            (Self::ENV_BATCH_SIZE, self.batch_size),
            (Self::ENV_CANDIDATE_BATCH_SIZE, self.candidate_batch_size),
            (Self::ENV_TOP_K, self.top_k),
            (Self::ENV_MAX_CONCURRENCY, self.max_concurrency),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.data_path.is_dir() {
            return Err(ConfigError::NotAFile {
                path: self.data_path.clone(),
            });
        }

        Ok(())
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(default)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
