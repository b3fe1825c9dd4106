//! # Design
//!
//! - Enumerate the root's immediate subdirectories once, sorted by name.
//! - Submit every folder job up front; a semaphore bounds how many run at once
//!   and each job body runs on the blocking pool.
//! - The run itself never fails: per-folder failures are already logged, and
//!   an unreadable root yields an empty report.

use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use foldpack_events::{Event, EventBus};
use foldpack_fsops::{FolderArchiver, FolderRemover, TreeRemover, ZipArchiver};
use foldpack_telemetry::error_chain;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::job::FolderJob;
use crate::progress::ProgressCounter;
use crate::task::TaskOutcome;

/// Knobs for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of folder jobs running at once.
    pub workers: NonZeroUsize,
    /// Plan only; leave the filesystem untouched.
    pub dry_run: bool,
}

impl RunOptions {
    /// Options for a real run with `workers` concurrent jobs.
    #[must_use]
    pub const fn new(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            dry_run: false,
        }
    }
}

/// Outcome of one folder in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    /// Folder name relative to the root.
    pub folder: String,
    /// Terminal outcome.
    pub outcome: TaskOutcome,
    /// Archive allocated for the folder, if any.
    pub archive_path: Option<PathBuf>,
}

/// Informational summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Directory whose subdirectories were processed.
    pub root: PathBuf,
    /// Number of folder jobs submitted.
    pub total: usize,
    /// Archived and removed.
    pub done: usize,
    /// Left in place because archiving failed.
    pub archive_failed: usize,
    /// Left in place next to their archive.
    pub delete_failed: usize,
    /// Dry-run plans.
    pub planned: usize,
    /// Per-folder outcomes sorted by folder name.
    pub tasks: Vec<TaskSummary>,
}

impl RunReport {
    fn new(root: &Path, total: usize) -> Self {
        Self {
            root: root.to_path_buf(),
            total,
            done: 0,
            archive_failed: 0,
            delete_failed: 0,
            planned: 0,
            tasks: Vec::with_capacity(total),
        }
    }

    fn record(&mut self, folder: String, outcome: TaskOutcome, archive_path: Option<PathBuf>) {
        match outcome {
            TaskOutcome::Done => self.done += 1,
            TaskOutcome::ArchiveFailed => self.archive_failed += 1,
            TaskOutcome::DeleteFailed => self.delete_failed += 1,
            TaskOutcome::Planned => self.planned += 1,
        }
        self.tasks.push(TaskSummary {
            folder,
            outcome,
            archive_path,
        });
    }

    /// Number of folders that did not reach `Done` or `Planned`.
    #[must_use]
    pub const fn failures(&self) -> usize {
        self.archive_failed + self.delete_failed
    }
}

/// Drives one archiving run over a root directory.
pub struct Coordinator {
    archiver: Arc<dyn FolderArchiver>,
    remover: Arc<dyn FolderRemover>,
    events: EventBus,
    options: RunOptions,
}

impl Coordinator {
    /// Coordinator using the zip archiver and recursive remover.
    #[must_use]
    pub fn new(events: EventBus, options: RunOptions) -> Self {
        Self {
            archiver: Arc::new(ZipArchiver::new()),
            remover: Arc::new(TreeRemover::new()),
            events,
            options,
        }
    }

    /// Replace the archiver.
    #[must_use]
    pub fn with_archiver(mut self, archiver: Arc<dyn FolderArchiver>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Replace the remover.
    #[must_use]
    pub fn with_remover(mut self, remover: Arc<dyn FolderRemover>) -> Self {
        self.remover = remover;
        self
    }

    /// Options this coordinator was built with.
    #[must_use]
    pub const fn options(&self) -> RunOptions {
        self.options
    }

    /// Archive and remove every immediate subdirectory of `root`.
    pub async fn run(&self, root: &Path) -> RunReport {
        let folders = match list_subdirectories(root) {
            Ok(folders) => folders,
            Err(err) => {
                error!(
                    root = %root.display(),
                    error = %error_chain(&err),
                    "unable to list root directory"
                );
                let report = RunReport::new(root, 0);
                self.complete(&report);
                return report;
            }
        };
        let total = folders.len();
        info!(
            root = %root.display(),
            workers = self.options.workers.get(),
            dry_run = self.options.dry_run,
            "archiving {total} folders under {}",
            root.display()
        );
        self.events.publish(Event::RunStarted {
            root: root.to_path_buf(),
            total,
        });

        let progress = Arc::new(ProgressCounter::new(total));
        let job = Arc::new(
            FolderJob::new(
                Arc::clone(&self.archiver),
                Arc::clone(&self.remover),
                progress,
                self.events.clone(),
            )
            .dry_run(self.options.dry_run),
        );
        let permits = Arc::new(Semaphore::new(self.options.workers.get()));
        let shared_root: Arc<Path> = Arc::from(root);

        let mut jobs = JoinSet::new();
        let mut folder_by_task = HashMap::with_capacity(total);
        for folder in folders {
            let job = Arc::clone(&job);
            let permits = Arc::clone(&permits);
            let root = Arc::clone(&shared_root);
            let name = folder.clone();
            let handle = jobs.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                task::spawn_blocking(move || job.run(&root, &name)).await
            });
            folder_by_task.insert(handle.id(), folder);
        }

        let mut report = RunReport::new(root, total);
        while let Some(joined) = jobs.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, blocking)) => (id, blocking),
                Err(err) => (err.id(), Err(err)),
            };
            let folder = folder_by_task.remove(&id).unwrap_or_default();
            match result {
                Ok(task) => {
                    let outcome = task.outcome().unwrap_or(TaskOutcome::ArchiveFailed);
                    report.record(folder, outcome, task.archive_path().map(Path::to_path_buf));
                }
                Err(err) => {
                    error!(folder = %folder, error = %err, "folder job panicked");
                    report.record(folder, TaskOutcome::ArchiveFailed, None);
                }
            }
        }
        report.tasks.sort_by(|left, right| left.folder.cmp(&right.folder));
        self.complete(&report);
        report
    }

    fn complete(&self, report: &RunReport) {
        info!(
            root = %report.root.display(),
            total = report.total,
            done = report.done,
            archive_failed = report.archive_failed,
            delete_failed = report.delete_failed,
            planned = report.planned,
            "archive run completed"
        );
        self.events.publish(Event::RunCompleted {
            total: report.total,
            done: report.done,
            archive_failed: report.archive_failed,
            delete_failed: report.delete_failed,
            planned: report.planned,
        });
    }
}

/// Names of the immediate subdirectories of `root`, sorted.
///
/// Symlinks are not followed, so a link to a directory is not listed. Names
/// that are not valid UTF-8 are skipped with a warning.
///
/// # Errors
///
/// Returns [`AppError::Io`] when the root or one of its entries cannot be read.
pub fn list_subdirectories(root: &Path) -> AppResult<Vec<String>> {
    let entries = fs::read_dir(root).map_err(|source| AppError::io("list.read_dir", root, source))?;
    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| AppError::io("list.entry", root, source))?;
        let file_type = entry
            .file_type()
            .map_err(|source| AppError::io("list.file_type", entry.path(), source))?;
        if !file_type.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => folders.push(name),
            Err(raw) => warn!(
                folder = %raw.to_string_lossy(),
                "skipping folder whose name is not valid UTF-8"
            ),
        }
    }
    folders.sort();
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use foldpack_test_support::fixtures::write_tree;
    use tempfile::TempDir;

    #[test]
    fn lists_only_directories_sorted() -> Result<()> {
        let temp = TempDir::new()?;
        write_tree(
            temp.path(),
            &[
                ("zeta/a.txt", b"a".as_slice()),
                ("alpha/b.txt", b"b".as_slice()),
                ("readme.txt", b"r".as_slice()),
            ],
        )?;
        fs::create_dir(temp.path().join("empty"))?;

        assert_eq!(list_subdirectories(temp.path())?, vec!["alpha", "empty", "zeta"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_listed() -> Result<()> {
        let temp = TempDir::new()?;
        let outside = TempDir::new()?;
        fs::create_dir(temp.path().join("real"))?;
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link"))?;

        assert_eq!(list_subdirectories(temp.path())?, vec!["real"]);
        Ok(())
    }

    #[test]
    fn missing_root_is_an_io_error() -> Result<()> {
        let temp = TempDir::new()?;
        let err = list_subdirectories(&temp.path().join("gone"));
        assert!(matches!(err, Err(AppError::Io { operation: "list.read_dir", .. })));
        Ok(())
    }

    #[test]
    fn report_counts_by_outcome() {
        let mut report = RunReport::new(Path::new("/data"), 3);
        report.record("a".into(), TaskOutcome::Done, None);
        report.record("b".into(), TaskOutcome::DeleteFailed, None);
        report.record("c".into(), TaskOutcome::ArchiveFailed, None);
        assert_eq!((report.done, report.delete_failed, report.archive_failed), (1, 1, 1));
        assert_eq!(report.failures(), 2);
    }
}
