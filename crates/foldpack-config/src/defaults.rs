//! Well-known defaults for a run.
//!
//! # Design
//! - The log file lives at a fixed relative location so repeated runs append to one file.

/// Log file appended to by every run, relative to the working directory.
pub const DEFAULT_LOG_PATH: &str = "process_log.txt";
/// Log level used when neither `RUST_LOG` nor `--log-level` is supplied.
pub const DEFAULT_LOG_LEVEL: &str = "info";
