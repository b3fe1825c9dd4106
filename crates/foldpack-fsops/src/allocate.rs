//! Collision-free archive path allocation.
//!
//! # Design
//! - `directory/<base>.zip` is tried first, then `<base>_1.zip`, `<base>_2.zip`, ...
//! - Existence is re-checked for every candidate, so archives left by earlier
//!   runs are never overwritten.
//! - The check and the later file creation are not atomic. Two concurrent
//!   allocations could only collide when they share a base name, and a run
//!   derives each base name from a distinct subdirectory, so no lock is taken.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{FsOpsError, FsOpsResult};

/// Extension given to every archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Return the first archive path under `directory` for `base_name` that does
/// not exist at call time.
///
/// # Errors
///
/// Returns an error when `base_name` is empty or contains a path separator,
/// or when probing a candidate fails for a reason other than absence.
pub fn allocate_archive_path(directory: &Path, base_name: &str) -> FsOpsResult<PathBuf> {
    validate_base_name(base_name)?;

    let first = directory.join(format!("{base_name}.{ARCHIVE_EXTENSION}"));
    if !path_taken(&first)? {
        return Ok(first);
    }

    for suffix in 1..=u32::MAX {
        let candidate = directory.join(format!("{base_name}_{suffix}.{ARCHIVE_EXTENSION}"));
        if !path_taken(&candidate)? {
            return Ok(candidate);
        }
    }

    Err(FsOpsError::InvalidInput {
        field: "base_name",
        reason: "suffixes_exhausted",
        value: Some(base_name.to_string()),
    })
}

fn validate_base_name(base_name: &str) -> FsOpsResult<()> {
    if base_name.is_empty() {
        return Err(FsOpsError::InvalidInput {
            field: "base_name",
            reason: "empty",
            value: None,
        });
    }
    if base_name.contains(['/', '\\']) || base_name == "." || base_name == ".." {
        return Err(FsOpsError::InvalidInput {
            field: "base_name",
            reason: "not_a_file_name",
            value: Some(base_name.to_string()),
        });
    }
    Ok(())
}

// A dangling symlink still occupies the name, so the link itself is probed.
fn path_taken(candidate: &Path) -> FsOpsResult<bool> {
    match fs::symlink_metadata(candidate) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(FsOpsError::io("allocate.probe", candidate, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    #[test]
    fn first_allocation_uses_plain_name() -> Result<()> {
        let temp = TempDir::new()?;
        let path = allocate_archive_path(temp.path(), "notes")?;
        assert_eq!(path, temp.path().join("notes.zip"));
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn existing_archives_get_incrementing_suffixes() -> Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join("notes.zip"), b"old")?;

        let second = allocate_archive_path(temp.path(), "notes")?;
        assert_eq!(second, temp.path().join("notes_1.zip"));
        fs::write(&second, b"second")?;

        let third = allocate_archive_path(temp.path(), "notes")?;
        assert_eq!(third, temp.path().join("notes_2.zip"));
        Ok(())
    }

    #[test]
    fn gaps_in_suffixes_are_reused() -> Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join("notes.zip"), b"")?;
        fs::write(temp.path().join("notes_2.zip"), b"")?;
        assert_eq!(
            allocate_archive_path(temp.path(), "notes")?,
            temp.path().join("notes_1.zip")
        );
        Ok(())
    }

    #[test]
    fn directories_named_like_archives_count_as_taken() -> Result<()> {
        let temp = TempDir::new()?;
        fs::create_dir(temp.path().join("notes.zip"))?;
        assert_eq!(
            allocate_archive_path(temp.path(), "notes")?,
            temp.path().join("notes_1.zip")
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlinks_count_as_taken() -> Result<()> {
        let temp = TempDir::new()?;
        std::os::unix::fs::symlink(temp.path().join("nowhere"), temp.path().join("notes.zip"))?;
        assert_eq!(
            allocate_archive_path(temp.path(), "notes")?,
            temp.path().join("notes_1.zip")
        );
        Ok(())
    }

    #[test]
    fn rejects_unusable_base_names() {
        let root = Path::new(".");
        assert!(matches!(
            allocate_archive_path(root, ""),
            Err(FsOpsError::InvalidInput { reason: "empty", .. })
        ));
        assert!(matches!(
            allocate_archive_path(root, "a/b"),
            Err(FsOpsError::InvalidInput {
                reason: "not_a_file_name",
                ..
            })
        ));
        assert!(allocate_archive_path(root, "..").is_err());
    }
}
