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

//! Folder archiving pipeline: one job per subdirectory, run concurrently on a
//! bounded worker pool.
//!
//! Layout: `task.rs` (per-folder state machine), `progress.rs` (shared
//! completion counter), `job.rs` (archive-then-remove for one folder),
//! `coordinator.rs` (enumeration, dispatch, run report), `bootstrap.rs`
//! (directory selection seam).

pub mod bootstrap;
pub mod coordinator;
pub mod error;
pub mod job;
pub mod progress;
pub mod task;

pub use bootstrap::{DirectorySelector, run_selected};
pub use coordinator::{Coordinator, RunOptions, RunReport, TaskSummary, list_subdirectories};
pub use error::{AppError, AppResult};
pub use job::FolderJob;
pub use progress::{ProgressCounter, ProgressSnapshot};
pub use task::{FolderTask, TaskOutcome, TaskState};
