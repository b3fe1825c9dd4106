//! Per-folder task state machine.
//!
//! `Pending -> Archiving -> {ArchivedOk -> Deleting -> {Done, DeleteFailed}, ArchiveFailed}`,
//! plus `Pending -> Planned` for dry runs. No state returns to `Pending`.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Lifecycle state of a folder task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Enumerated, not yet picked up.
    Pending,
    /// Archive being written.
    Archiving,
    /// Archive complete; source not yet removed.
    ArchivedOk,
    /// Source folder being removed.
    Deleting,
    /// Archived and removed.
    Done,
    /// Archived, but the source folder is still present.
    DeleteFailed,
    /// Not archived and not removed.
    ArchiveFailed,
    /// Dry run: archive path allocated, nothing written.
    Planned,
}

impl TaskState {
    /// Whether the state machine permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Archiving | Self::Planned)
                | (Self::Archiving, Self::ArchivedOk | Self::ArchiveFailed)
                | (Self::ArchivedOk, Self::Deleting)
                | (Self::Deleting, Self::Done | Self::DeleteFailed)
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Done | Self::DeleteFailed | Self::ArchiveFailed | Self::Planned
        )
    }

    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Archiving => "archiving",
            Self::ArchivedOk => "archived_ok",
            Self::Deleting => "deleting",
            Self::Done => "done",
            Self::DeleteFailed => "delete_failed",
            Self::ArchiveFailed => "archive_failed",
            Self::Planned => "planned",
        }
    }
}

impl Display for TaskState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Final result of a folder task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Archived and removed.
    Done,
    /// Archive failed; folder untouched.
    ArchiveFailed,
    /// Archive written; folder still present.
    DeleteFailed,
    /// Dry run only.
    Planned,
}

impl TaskOutcome {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::ArchiveFailed => "archive_failed",
            Self::DeleteFailed => "delete_failed",
            Self::Planned => "planned",
        }
    }
}

/// One subdirectory to archive and remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderTask {
    folder: String,
    source: PathBuf,
    archive_path: Option<PathBuf>,
    state: TaskState,
}

impl FolderTask {
    /// Create a pending task for `root/folder`.
    #[must_use]
    pub fn new(root: &Path, folder: &str) -> Self {
        Self {
            folder: folder.to_string(),
            source: root.join(folder),
            archive_path: None,
            state: TaskState::Pending,
        }
    }

    /// Folder name relative to the root.
    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Absolute path of the folder being archived.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Archive path, once allocated.
    #[must_use]
    pub fn archive_path(&self) -> Option<&Path> {
        self.archive_path.as_deref()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    pub(crate) fn assign_archive_path(&mut self, path: PathBuf) {
        self.archive_path = Some(path);
    }

    /// Move to `next` if the state machine allows it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidTransition`] for a forbidden move; the state
    /// is left unchanged.
    pub fn advance(&mut self, next: TaskState) -> AppResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                folder: self.folder.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Outcome for a task in a terminal state, `None` otherwise.
    #[must_use]
    pub const fn outcome(&self) -> Option<TaskOutcome> {
        match self.state {
            TaskState::Done => Some(TaskOutcome::Done),
            TaskState::DeleteFailed => Some(TaskOutcome::DeleteFailed),
            TaskState::ArchiveFailed => Some(TaskOutcome::ArchiveFailed),
            TaskState::Planned => Some(TaskOutcome::Planned),
            TaskState::Pending
            | TaskState::Archiving
            | TaskState::ArchivedOk
            | TaskState::Deleting => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaskState; 8] = [
        TaskState::Pending,
        TaskState::Archiving,
        TaskState::ArchivedOk,
        TaskState::Deleting,
        TaskState::Done,
        TaskState::DeleteFailed,
        TaskState::ArchiveFailed,
        TaskState::Planned,
    ];

    #[test]
    fn happy_path_reaches_done() -> AppResult<()> {
        let mut task = FolderTask::new(Path::new("/data"), "photos");
        assert_eq!(task.source(), Path::new("/data/photos"));
        assert_eq!(task.outcome(), None);
        for next in [
            TaskState::Archiving,
            TaskState::ArchivedOk,
            TaskState::Deleting,
            TaskState::Done,
        ] {
            task.advance(next)?;
        }
        assert_eq!(task.outcome(), Some(TaskOutcome::Done));
        Ok(())
    }

    #[test]
    fn archive_failure_cannot_proceed_to_deletion() -> AppResult<()> {
        let mut task = FolderTask::new(Path::new("/data"), "photos");
        task.advance(TaskState::Archiving)?;
        task.advance(TaskState::ArchiveFailed)?;
        let err = task.advance(TaskState::Deleting);
        assert!(matches!(
            err,
            Err(AppError::InvalidTransition {
                from: TaskState::ArchiveFailed,
                to: TaskState::Deleting,
                ..
            })
        ));
        assert_eq!(task.state(), TaskState::ArchiveFailed);
        Ok(())
    }

    #[test]
    fn no_state_returns_to_pending_and_terminals_are_final() {
        for from in ALL {
            assert!(!from.can_transition_to(TaskState::Pending), "{from} -> pending");
            if from.is_terminal() {
                for to in ALL {
                    assert!(!from.can_transition_to(to), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn deletion_requires_successful_archive() {
        assert!(!TaskState::Archiving.can_transition_to(TaskState::Deleting));
        assert!(!TaskState::Pending.can_transition_to(TaskState::Done));
        assert!(TaskState::ArchivedOk.can_transition_to(TaskState::Deleting));
    }
}
