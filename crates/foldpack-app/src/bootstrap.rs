//! Directory selection and the top-level run entry point.

use std::path::PathBuf;

use tracing::info;

use crate::coordinator::{Coordinator, RunReport};
use crate::error::{AppError, AppResult};

/// Source of the root directory for a run.
pub trait DirectorySelector: Send + Sync {
    /// Return the chosen directory, or `None` when the user made no choice.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the selection mechanism itself
    /// fails (for example, the terminal cannot be read).
    fn select_directory(&self) -> AppResult<Option<PathBuf>>;
}

/// Ask `selector` for a root and run `coordinator` over it.
///
/// Returns `Ok(None)` when nothing was selected.
///
/// # Errors
///
/// Returns an error when the selector fails or the selected path is not an
/// existing directory.
pub async fn run_selected(
    selector: &dyn DirectorySelector,
    coordinator: &Coordinator,
) -> AppResult<Option<RunReport>> {
    let Some(root) = selector.select_directory()? else {
        info!("no directory was selected");
        return Ok(None);
    };
    if !root.is_dir() {
        return Err(AppError::RootUnavailable { path: root });
    }
    Ok(Some(coordinator.run(&root).await))
}
