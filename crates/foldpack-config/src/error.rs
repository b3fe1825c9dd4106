//! Error types for run configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The selected root directory does not exist or is not a directory.
    #[error("root directory unavailable")]
    RootUnavailable {
        /// Path supplied by the selector.
        path: PathBuf,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Log format value was not recognised.
    #[error("invalid log format")]
    InvalidLogFormat {
        /// Log format payload provided by the caller.
        value: String,
    },
}
