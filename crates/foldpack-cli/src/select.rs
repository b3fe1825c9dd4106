//! Directory selectors.

use std::io;
use std::path::PathBuf;

use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use foldpack_app::{AppError, AppResult, DirectorySelector};

/// Uses the root given on the command line or in `FOLDPACK_ROOT`.
pub(crate) struct ArgumentSelector {
    root: Option<PathBuf>,
}

impl ArgumentSelector {
    pub(crate) const fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

impl DirectorySelector for ArgumentSelector {
    fn select_directory(&self) -> AppResult<Option<PathBuf>> {
        Ok(self.root.clone())
    }
}

/// Asks for a directory on the terminal. An empty answer selects nothing.
pub(crate) struct PromptSelector {
    theme: ColorfulTheme,
}

impl PromptSelector {
    pub(crate) fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl DirectorySelector for PromptSelector {
    fn select_directory(&self) -> AppResult<Option<PathBuf>> {
        let answer: String = Input::with_theme(&self.theme)
            .with_prompt("Folder whose subfolders should be archived (empty to cancel)")
            .allow_empty(true)
            .interact_text()
            .map_err(|err| AppError::Io {
                operation: "select.prompt",
                path: None,
                source: io::Error::other(err),
            })?;
        Ok(parse_answer(&answer))
    }
}

fn parse_answer(answer: &str) -> Option<PathBuf> {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}
