//! Deterministic input hashing for freshness checks.
//!
//! Inputs are serialized through `serde_json`, normalized, and fed to BLAKE3 so that
//! values which differ only in representation hash identically:
//!
//! - object keys are sorted
//! - RFC 3339 timestamps are rewritten as UTC with millisecond precision
//! - integers beyond ±2^53 become decimal strings; integral floats become integers
//! - `None` / unit become `null`
//!
//! The job name and algorithm version seed every hash, so bumping the algorithm
//! version invalidates all stored hashes for that job.

use blake3::Hasher;
use chrono::{DateTime, SecondsFormat};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Largest integer magnitude a double represents exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Separates records fed to the hasher.
const RECORD_SEPARATOR: &[u8] = b"\x1e";

#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to serialize hash input: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Streaming BLAKE3 hasher over normalized serde values.
#[derive(Debug, Clone)]
pub struct InputHasher {
    hasher: Hasher,
}

impl InputHasher {
    /// Seeds the hash with `job` and `algorithm_version`, each length-prefixed.
    pub fn new(job: &str, algorithm_version: &str) -> Self {
        let mut hasher = Hasher::new();
        for field in [job, algorithm_version] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.update(RECORD_SEPARATOR);
        Self { hasher }
    }

    /// Appends one normalized value.
    pub fn update<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, HashError> {
        let canonical = normalize(serde_json::to_value(value)?);
        self.hasher.update(&serde_json::to_vec(&canonical)?);
        self.hasher.update(RECORD_SEPARATOR);
        Ok(self)
    }

    /// Lowercase hex digest (64 characters).
    pub fn finalize(&self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

/// One-shot hash of a single input value.
pub fn input_hash<T: Serialize + ?Sized>(
    job: &str,
    algorithm_version: &str,
    value: &T,
) -> Result<String, HashError> {
    let mut hasher = InputHasher::new(job, algorithm_version);
    hasher.update(value)?;
    Ok(hasher.finalize())
}

/// Rewrites `value` into its canonical form.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key, normalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Number(number) => normalize_number(number),
        Value::String(text) => normalize_string(text),
        other => other,
    }
}

fn normalize_number(number: Number) -> Value {
    if let Some(u) = number.as_u64() {
        return if u > MAX_SAFE_INTEGER {
            Value::String(u.to_string())
        } else {
            Value::Number(u.into())
        };
    }
    if let Some(i) = number.as_i64() {
        return if i.unsigned_abs() > MAX_SAFE_INTEGER {
            Value::String(i.to_string())
        } else {
            Value::Number(i.into())
        };
    }
    match number.as_f64() {
        Some(f) if f == 0.0 => Value::Number(0u64.into()),
        Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER as f64 => {
            Value::Number((f as i64).into())
        }
        _ => Value::Number(number),
    }
}

fn normalize_string(text: String) -> Value {
    match DateTime::parse_from_rfc3339(&text) {
        Ok(ts) => Value::String(ts.to_utc().to_rfc3339_opts(SecondsFormat::Millis, true)),
        Err(_) => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::INPUT_HASH_HEX_LEN;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_input_hash_determinism() {
        let value = json!({"viewer": 1, "interests": ["a", "b"]});
        let h1 = input_hash("match-scores", "v1", &value).unwrap();
        let h2 = input_hash("match-scores", "v1", &value).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), INPUT_HASH_HEX_LEN);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_job_and_version_seed_the_hash() {
        let value = json!({"viewer": 1});
        let hashes: HashSet<_> = [
            input_hash("match-scores", "v1", &value).unwrap(),
            input_hash("match-scores", "v2", &value).unwrap(),
            input_hash("trait-profiles", "v1", &value).unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(hashes.len(), 3);
    }

    #[test]
    fn test_seed_fields_cannot_shift_across_boundary() {
        let value = json!({"viewer": 1});
        assert_ne!(
            input_hash("a|b", "c", &value).unwrap(),
            input_hash("a", "b|c", &value).unwrap()
        );
        assert_ne!(
            input_hash("ab", "c", &value).unwrap(),
            input_hash("a", "bc", &value).unwrap()
        );
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"b": 2, "a": {"y": 1, "x": 0}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"x": 0, "y": 1}, "b": 2}"#).unwrap();
        assert_eq!(
            input_hash("job", "v1", &a).unwrap(),
            input_hash("job", "v1", &b).unwrap()
        );
    }

    #[test]
    fn test_timestamps_normalized_to_utc_millis() {
        let a = json!({"at": "2024-01-01T09:00:00+09:00"});
        let b = json!({"at": "2024-01-01T00:00:00.000Z"});
        assert_eq!(normalize(a.clone()), json!({"at": "2024-01-01T00:00:00.000Z"}));
        assert_eq!(
            input_hash("job", "v1", &a).unwrap(),
            input_hash("job", "v1", &b).unwrap()
        );
    }

    #[test]
    fn test_large_integers_rendered_as_strings() {
        let big = u64::MAX;
        assert_eq!(normalize(json!(big)), json!(big.to_string()));
        assert_eq!(normalize(json!(i64::MIN)), json!(i64::MIN.to_string()));
        assert_eq!(normalize(json!(42)), json!(42));
        assert_eq!(
            input_hash("job", "v1", &json!(big)).unwrap(),
            input_hash("job", "v1", &json!("18446744073709551615")).unwrap()
        );
    }

    #[test]
    fn test_integral_floats_match_integers() {
        assert_eq!(normalize(json!(3.0)), json!(3));
        assert_eq!(normalize(json!(-0.0)), json!(0));
        assert_eq!(normalize(json!(0.25)), json!(0.25));
    }

    #[test]
    fn test_none_hashes_as_null() {
        let none: Option<u32> = None;
        assert_eq!(
            input_hash("job", "v1", &none).unwrap(),
            input_hash("job", "v1", &Value::Null).unwrap()
        );
    }

    #[test]
    fn test_streaming_updates_are_order_sensitive() {
        let mut ab = InputHasher::new("job", "v1");
        ab.update(&json!("a")).unwrap().update(&json!("b")).unwrap();
        let mut ba = InputHasher::new("job", "v1");
        ba.update(&json!("b")).unwrap().update(&json!("a")).unwrap();
        assert_ne!(ab.finalize(), ba.finalize());
    }

    #[test]
    fn test_record_boundaries_are_unambiguous() {
        let mut split = InputHasher::new("job", "v1");
        split.update(&json!("ab")).unwrap();
        let mut joined = InputHasher::new("job", "v1");
        joined.update(&json!("a")).unwrap().update(&json!("b")).unwrap();
        assert_ne!(split.finalize(), joined.finalize());
    }
}
