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
#![allow(clippy::redundant_pub_crate)]

//! Command-line front end: archive every subdirectory of a folder and remove
//! the originals.
//!
//! Layout:
//! - `cli.rs`: argument parsing, setup, and exit codes
//! - `select.rs`: directory selectors (argument or interactive prompt)
//! - `progress.rs`: terminal progress bar fed by run events
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod progress;
pub(crate) mod select;

pub use cli::{run, run_from};
