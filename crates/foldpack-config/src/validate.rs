//! Validation helpers for run configuration.

use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;

use crate::error::{ConfigError, ConfigResult};

/// Worker count matching the host's available parallelism, never below one.
#[must_use]
pub fn available_workers() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Resolve an optional override into a concrete worker pool size.
#[must_use]
pub fn resolve_workers(requested: Option<NonZeroUsize>) -> NonZeroUsize {
    requested.unwrap_or_else(available_workers)
}

pub(crate) fn validate_log_path(path: &Path) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidField {
            field: "log_path",
            reason: "empty",
            value: None,
        });
    }
    if path.is_dir() {
        return Err(ConfigError::InvalidField {
            field: "log_path",
            reason: "is_directory",
            value: Some(path.display().to_string()),
        });
    }
    Ok(())
}

pub(crate) fn validate_log_level(level: &str) -> ConfigResult<()> {
    if level.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            field: "log_level",
            reason: "empty",
            value: Some(level.to_string()),
        });
    }
    Ok(())
}

pub(crate) fn validate_root(root: &Path) -> ConfigResult<()> {
    match root.metadata() {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ConfigError::RootUnavailable {
            path: root.to_path_buf(),
            reason: "not_a_directory",
        }),
        Err(_) => Err(ConfigError::RootUnavailable {
            path: root.to_path_buf(),
            reason: "not_found",
        }),
    }
}
