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

//! Run configuration for foldpack.
//!
//! Layout: `model.rs` (typed run settings), `validate.rs` (validation and
//! worker resolution), `defaults.rs` (well-known defaults), `error.rs`.

pub mod defaults;
pub mod error;
pub mod model;
pub mod validate;

pub use defaults::{DEFAULT_LOG_LEVEL, DEFAULT_LOG_PATH};
pub use error::{ConfigError, ConfigResult};
pub use model::{LogFormatSetting, RunConfig, ValidatedConfig};
pub use validate::{available_workers, resolve_workers};
