//! # Design
//!
//! - Centralize application-level errors for enumeration and orchestration.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Per-folder archive and removal failures never surface here; they are
//!   recorded as task outcomes.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::task::TaskState;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
    /// The selected root is missing or not a directory.
    #[error("root directory unavailable")]
    RootUnavailable {
        /// Path returned by the selector.
        path: PathBuf,
    },
    /// A folder task was asked to make a transition its state machine forbids.
    #[error("invalid task transition")]
    InvalidTransition {
        /// Folder the task belongs to.
        folder: String,
        /// State before the attempted transition.
        from: TaskState,
        /// Requested state.
        to: TaskState,
    },
}

impl AppError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: Some(path.into()),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn app_error_helpers_build_variants() {
        let io = AppError::io("list_root", "/data", io::Error::other("denied"));
        assert!(matches!(io, AppError::Io { path: Some(_), .. }));
        assert!(io.source().is_some());
        assert_eq!(io.to_string(), "io operation failed");

        let transition = AppError::InvalidTransition {
            folder: "a".to_string(),
            from: TaskState::Done,
            to: TaskState::Pending,
        };
        assert_eq!(transition.to_string(), "invalid task transition");
        assert!(transition.source().is_none());
    }
}
