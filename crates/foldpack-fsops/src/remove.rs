//! Recursive removal of an archived folder.

use std::fs;
use std::path::Path;

use foldpack_telemetry::error_chain;
use tracing::{error, info};

use crate::error::{FsOpsError, FsOpsResult};
use crate::folder_label;

/// Deletes a folder tree once its archive is complete.
pub trait FolderRemover: Send + Sync {
    /// Remove `path` and everything beneath it.
    ///
    /// # Errors
    ///
    /// Returns an error when any part of the tree cannot be removed; the
    /// folder may be left partially deleted.
    fn remove(&self, path: &Path) -> FsOpsResult<()>;
}

/// Remover backed by [`fs::remove_dir_all`], which never follows symlinks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeRemover;

impl TreeRemover {
    /// Construct the remover.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FolderRemover for TreeRemover {
    fn remove(&self, path: &Path) -> FsOpsResult<()> {
        let folder = folder_label(path);
        match remove_tree(path) {
            Ok(()) => {
                info!(folder = %folder, "folder removed");
                Ok(())
            }
            Err(err) => {
                error!(
                    folder = %folder,
                    operation = err.operation(),
                    path = %path.display(),
                    error = %error_chain(&err),
                    "error while removing folder"
                );
                Err(err)
            }
        }
    }
}

fn remove_tree(path: &Path) -> FsOpsResult<()> {
    let metadata =
        fs::symlink_metadata(path).map_err(|err| FsOpsError::io("remove.stat", path, err))?;
    if !metadata.is_dir() {
        return Err(FsOpsError::InvalidInput {
            field: "remove_path",
            reason: "not_a_directory",
            value: Some(path.display().to_string()),
        });
    }
    fs::remove_dir_all(path).map_err(|err| FsOpsError::io("remove.tree", path, err))
}
