//! Typed run configuration.
//!
//! # Design
//! - `RunConfig` mirrors what the CLI collects; every field has a usable default.
//! - `ValidatedConfig` is only produced by [`RunConfig::validate`], so holders can
//!   rely on a concrete worker count and a usable log path.

use std::fmt::{self, Display, Formatter};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_LOG_LEVEL, DEFAULT_LOG_PATH};
use crate::error::{ConfigError, ConfigResult};
use crate::validate::{resolve_workers, validate_log_level, validate_log_path, validate_root};

/// Console rendering selected for log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormatSetting {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormatSetting {
    /// Stable string form used by the CLI and environment variables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl Display for LogFormatSetting {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for LogFormatSetting {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat {
                value: value.to_string(),
            }),
        }
    }
}

/// Unvalidated settings for a single archiving run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory whose immediate subdirectories are archived, when already known.
    pub root: Option<PathBuf>,
    /// Worker pool size override; defaults to the host's available parallelism.
    pub workers: Option<NonZeroUsize>,
    /// Append-only log file.
    pub log_path: PathBuf,
    /// Prefix each log file line with an RFC 3339 timestamp.
    pub log_timestamps: bool,
    /// Tracing filter directive used when `RUST_LOG` is absent.
    pub log_level: String,
    /// Console rendering.
    pub log_format: LogFormatSetting,
    /// Plan archive paths without writing or deleting anything.
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root: None,
            workers: None,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            log_timestamps: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormatSetting::default(),
            dry_run: false,
        }
    }
}

impl RunConfig {
    /// Validate the settings and resolve defaults that depend on the host.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the log path or level is unusable, or when a
    /// supplied root is not an existing directory.
    pub fn validate(self) -> ConfigResult<ValidatedConfig> {
        validate_log_path(&self.log_path)?;
        validate_log_level(&self.log_level)?;
        if let Some(root) = self.root.as_deref() {
            validate_root(root)?;
        }

        Ok(ValidatedConfig {
            root: self.root,
            workers: resolve_workers(self.workers),
            log_path: self.log_path,
            log_timestamps: self.log_timestamps,
            log_level: self.log_level.trim().to_string(),
            log_format: self.log_format,
            dry_run: self.dry_run,
        })
    }
}

/// Settings that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    /// Root directory, if it was supplied up front.
    pub root: Option<PathBuf>,
    /// Concrete worker pool size.
    pub workers: NonZeroUsize,
    /// Append-only log file.
    pub log_path: PathBuf,
    /// Prefix each log file line with an RFC 3339 timestamp.
    pub log_timestamps: bool,
    /// Tracing filter directive.
    pub log_level: String,
    /// Console rendering.
    pub log_format: LogFormatSetting,
    /// Plan only.
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn log_format_parses_known_values() -> Result<()> {
        assert_eq!("json".parse::<LogFormatSetting>()?, LogFormatSetting::Json);
        assert_eq!(
            " Pretty ".parse::<LogFormatSetting>()?,
            LogFormatSetting::Pretty
        );
        assert_eq!("text".parse::<LogFormatSetting>()?, LogFormatSetting::Pretty);
        assert!(matches!(
            "xml".parse::<LogFormatSetting>(),
            Err(ConfigError::InvalidLogFormat { .. })
        ));
        assert_eq!(LogFormatSetting::Json.to_string(), "json");
        Ok(())
    }

    #[test]
    fn default_config_validates() -> Result<()> {
        let validated = RunConfig::default().validate()?;
        assert!(validated.root.is_none());
        assert_eq!(validated.log_path, PathBuf::from(DEFAULT_LOG_PATH));
        assert_eq!(validated.log_level, DEFAULT_LOG_LEVEL);
        assert!(validated.workers.get() >= 1);
        assert!(!validated.dry_run);
        Ok(())
    }

    #[test]
    fn validate_keeps_explicit_worker_override() -> Result<()> {
        let workers = NonZeroUsize::new(3).ok_or_else(|| anyhow::anyhow!("non-zero"))?;
        let config = RunConfig {
            workers: Some(workers),
            ..RunConfig::default()
        };
        assert_eq!(config.validate()?.workers, workers);
        Ok(())
    }

    #[test]
    fn validate_rejects_missing_root() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = RunConfig {
            root: Some(temp.path().join("missing")),
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RootUnavailable {
                reason: "not_found",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn validate_trims_log_level() -> Result<()> {
        let config = RunConfig {
            log_level: "  debug ".to_string(),
            ..RunConfig::default()
        };
        assert_eq!(config.validate()?.log_level, "debug");
        Ok(())
    }
}
