//! # Design
//!
//! - One `FolderJob::run` call owns one folder from allocation to removal.
//! - Archive and removal failures are recovered here and become the task's
//!   terminal state; nothing propagates to the coordinator.
//! - A completion guard bumps the shared counter exactly once per call, even
//!   when the archiver or remover unwinds.

use std::path::Path;
use std::sync::Arc;

use foldpack_events::{Event, EventBus, FailureStage};
use foldpack_fsops::{FolderArchiver, FolderRemover, FsOpsError, allocate_archive_path};
use foldpack_telemetry::error_chain;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::progress::ProgressCounter;
use crate::task::{FolderTask, TaskState};

/// Archive-then-remove procedure for a single subdirectory.
pub struct FolderJob {
    archiver: Arc<dyn FolderArchiver>,
    remover: Arc<dyn FolderRemover>,
    progress: Arc<ProgressCounter>,
    events: EventBus,
    dry_run: bool,
}

impl FolderJob {
    /// Build a job sharing the given collaborators and counter.
    #[must_use]
    pub fn new(
        archiver: Arc<dyn FolderArchiver>,
        remover: Arc<dyn FolderRemover>,
        progress: Arc<ProgressCounter>,
        events: EventBus,
    ) -> Self {
        Self {
            archiver,
            remover,
            progress,
            events,
            dry_run: false,
        }
    }

    /// Only allocate archive paths; never write or delete.
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Process `root/folder` and return the task in its terminal state.
    ///
    /// Blocking; call from a blocking-capable thread.
    #[must_use]
    pub fn run(&self, root: &Path, folder: &str) -> FolderTask {
        let _completion = CompletionGuard {
            progress: &self.progress,
            events: &self.events,
        };
        let mut task = FolderTask::new(root, folder);
        self.events.publish(Event::FolderStarted {
            folder: folder.to_string(),
        });

        let result = if self.dry_run {
            Self::plan(root, &mut task)
        } else {
            self.execute(root, &mut task)
        };
        if let Err(err) = result {
            error!(
                folder,
                state = %task.state(),
                error = %error_chain(&err),
                "folder task left in an unexpected state"
            );
        }
        task
    }

    fn plan(root: &Path, task: &mut FolderTask) -> AppResult<()> {
        match allocate_archive_path(root, task.folder()) {
            Ok(archive_path) => {
                info!(
                    folder = task.folder(),
                    archive = %archive_path.display(),
                    "dry run: folder would be archived and removed"
                );
                task.assign_archive_path(archive_path);
            }
            Err(err) => {
                warn!(
                    folder = task.folder(),
                    error = %error_chain(&err),
                    "dry run: no archive path available for folder"
                );
            }
        }
        task.advance(TaskState::Planned)
    }

    fn execute(&self, root: &Path, task: &mut FolderTask) -> AppResult<()> {
        task.advance(TaskState::Archiving)?;
        let archive_path = match allocate_archive_path(root, task.folder()) {
            Ok(path) => path,
            Err(err) => {
                error!(
                    folder = task.folder(),
                    operation = err.operation(),
                    error = %error_chain(&err),
                    "unable to allocate archive path"
                );
                self.compression_failed(task, &err);
                return task.advance(TaskState::ArchiveFailed);
            }
        };
        task.assign_archive_path(archive_path.clone());

        match self.archiver.archive(task.source(), &archive_path) {
            Ok(summary) => {
                debug!(
                    folder = task.folder(),
                    files = summary.files,
                    directories = summary.directories,
                    bytes = summary.bytes_read,
                    "archive summary"
                );
                self.events.publish(Event::FolderArchived {
                    folder: task.folder().to_string(),
                    archive_path,
                    files: summary.files,
                });
                task.advance(TaskState::ArchivedOk)?;
            }
            Err(err) => {
                self.compression_failed(task, &err);
                return task.advance(TaskState::ArchiveFailed);
            }
        }

        task.advance(TaskState::Deleting)?;
        match self.remover.remove(task.source()) {
            Ok(()) => {
                self.events.publish(Event::FolderRemoved {
                    folder: task.folder().to_string(),
                });
                task.advance(TaskState::Done)
            }
            Err(err) => {
                warn!(folder = task.folder(), "deletion of folder failed");
                self.events.publish(Event::FolderFailed {
                    folder: task.folder().to_string(),
                    stage: FailureStage::Delete,
                    message: error_chain(&err),
                });
                task.advance(TaskState::DeleteFailed)
            }
        }
    }

    fn compression_failed(&self, task: &FolderTask, err: &FsOpsError) {
        warn!(folder = task.folder(), "compression of folder failed");
        self.events.publish(Event::FolderFailed {
            folder: task.folder().to_string(),
            stage: FailureStage::Archive,
            message: error_chain(err),
        });
    }
}

struct CompletionGuard<'a> {
    progress: &'a ProgressCounter,
    events: &'a EventBus,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        let snapshot = self.progress.increment();
        debug!(
            completed = snapshot.completed,
            total = snapshot.total,
            percent = snapshot.percent(),
            "progress"
        );
        self.events.publish(Event::Progress {
            completed: snapshot.completed,
            total: snapshot.total,
        });
    }
}
