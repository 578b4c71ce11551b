//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric environment variable could not be parsed.
    #[error("failed to parse {name}='{value}' as a number")]
    InvalidNumber { name: &'static str, value: String },

    /// A value parsed but violates a range or presence invariant.
    #[error("invalid {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    /// A weight entry is not of the form `key=value`.
    #[error("malformed weight entry '{entry}': expected key=value")]
    MalformedWeight { entry: String },

    /// A weight names an operator that does not exist.
    #[error("unknown weight key '{key}'")]
    UnknownWeightKey { key: String },

    /// Path exists but is a directory (when a file was expected).
    #[error("path is a directory, expected a file: {path}")]
    NotAFile { path: PathBuf },
}
