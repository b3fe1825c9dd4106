#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Logging primitives shared across the foldpack workspace.
//!
//! Layout: `init.rs` (subscriber installation), `run_log.rs` (the persistent
//! append-only log and its tracing layer), `error.rs`.

pub mod error;
pub mod init;
pub mod run_log;

use std::error::Error;

use anyhow::Chain;

pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
pub use run_log::{LogLevel, RunLog, RunLogLayer, RunLogOptions};

/// Render an error followed by every source in its chain, joined with `": "`.
#[must_use]
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    Chain::new(error)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}
