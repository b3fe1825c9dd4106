//! Zip archiving of a folder tree.
//!
//! # Design
//! - Entries are named by their path relative to the archived folder, joined
//!   with `/`, and every file entry is deflate-compressed.
//! - A directory with nothing archived beneath it (empty, or holding only
//!   skipped entries) is stored as a `name/` entry so the tree shape survives.
//! - Symlinks are resolved: file targets are archived by content, directory
//!   targets are skipped, dangling links fail the archive.
//! - Any failure aborts the archive; the partial output file is removed on a
//!   best-effort basis and the caller must not delete the source.

use std::collections::HashSet;
use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};

use foldpack_telemetry::error_chain;
use tracing::{debug, error, info};
use walkdir::{DirEntry, WalkDir};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::error::{FsOpsError, FsOpsResult};
use crate::folder_label;

/// Counts describing a written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Archive written to disk.
    pub archive_path: PathBuf,
    /// File entries written.
    pub files: usize,
    /// Empty directory entries written.
    pub directories: usize,
    /// Uncompressed bytes read from the source tree.
    pub bytes_read: u64,
}

/// Writes a folder tree into a single archive file.
pub trait FolderArchiver: Send + Sync {
    /// Archive every file under `source` into `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error when the tree cannot be read or the archive cannot be
    /// written; the source is never modified.
    fn archive(&self, source: &Path, destination: &Path) -> FsOpsResult<ArchiveSummary>;
}

/// Deflate-compressed zip archiver backed by `walkdir`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    /// Construct the archiver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FolderArchiver for ZipArchiver {
    fn archive(&self, source: &Path, destination: &Path) -> FsOpsResult<ArchiveSummary> {
        let folder = folder_label(source);
        match write_archive(source, destination) {
            Ok(summary) => {
                info!(
                    folder = %folder,
                    archive = %destination.display(),
                    files = summary.files,
                    "folder compressed"
                );
                Ok(summary)
            }
            Err(err) => {
                error!(
                    folder = %folder,
                    operation = err.operation(),
                    path = %err.path().unwrap_or(source).display(),
                    error = %error_chain(&err),
                    "error while compressing folder"
                );
                Err(err)
            }
        }
    }
}

struct ArchiveTarget<'a> {
    destination: &'a Path,
    writer: ZipWriter<File>,
    summary: ArchiveSummary,
    /// Directory names with at least one entry written beneath them.
    populated: HashSet<String>,
}

impl ArchiveTarget<'_> {
    fn mark_written(&mut self, name: &str) {
        for (index, _) in name.match_indices('/') {
            self.populated.insert(name[..index].to_string());
        }
    }
}

fn write_archive(source: &Path, destination: &Path) -> FsOpsResult<ArchiveSummary> {
    ensure_directory(source)?;

    let file = File::options()
        .write(true)
        .create_new(true)
        .open(destination)
        .map_err(|err| FsOpsError::io("archive.create", destination, err))?;

    let mut target = ArchiveTarget {
        destination,
        writer: ZipWriter::new(file),
        summary: ArchiveSummary {
            archive_path: destination.to_path_buf(),
            files: 0,
            directories: 0,
            bytes_read: 0,
        },
        populated: HashSet::new(),
    };

    let written = append_tree(&mut target, source).and_then(|()| finish(target));
    if written.is_err()
        && let Err(cleanup_err) = fs::remove_file(destination)
    {
        debug!(
            archive = %destination.display(),
            error = %cleanup_err,
            "partial archive left on disk"
        );
    }
    written
}

fn ensure_directory(source: &Path) -> FsOpsResult<()> {
    let metadata =
        fs::symlink_metadata(source).map_err(|err| FsOpsError::io("archive.stat", source, err))?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(FsOpsError::InvalidInput {
            field: "source_path",
            reason: "not_a_directory",
            value: Some(source.display().to_string()),
        })
    }
}

fn append_tree(target: &mut ArchiveTarget<'_>, source: &Path) -> FsOpsResult<()> {
    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .contents_first(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|err| FsOpsError::walkdir("archive.walk", source, err))?;
        let name = entry_name(source, entry.path())?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if !target.populated.contains(&name) {
                add_directory(target, &name)?;
            }
        } else if file_type.is_file() {
            let metadata = entry
                .metadata()
                .map_err(|err| FsOpsError::walkdir("archive.metadata", entry.path(), err))?;
            add_file(target, entry.path(), &name, &metadata)?;
        } else if file_type.is_symlink() {
            append_symlink(target, &entry, &name)?;
        } else {
            debug!(path = %entry.path().display(), "skipping special file");
        }
    }
    Ok(())
}

fn append_symlink(target: &mut ArchiveTarget<'_>, entry: &DirEntry, name: &str) -> FsOpsResult<()> {
    let resolved = fs::metadata(entry.path())
        .map_err(|err| FsOpsError::io("archive.resolve_link", entry.path(), err))?;
    if resolved.is_file() {
        add_file(target, entry.path(), name, &resolved)
    } else {
        debug!(path = %entry.path().display(), "skipping symlinked directory");
        Ok(())
    }
}

fn add_file(
    target: &mut ArchiveTarget<'_>,
    path: &Path,
    name: &str,
    metadata: &Metadata,
) -> FsOpsResult<()> {
    let mut input = File::open(path).map_err(|err| FsOpsError::io("archive.open", path, err))?;
    let options = file_options(metadata);
    target
        .writer
        .start_file(name, options)
        .map_err(|err| FsOpsError::zip("archive.start_file", target.destination, err))?;
    let copied = io::copy(&mut input, &mut target.writer)
        .map_err(|err| FsOpsError::io("archive.copy", path, err))?;
    target.summary.files += 1;
    target.summary.bytes_read += copied;
    target.mark_written(name);
    Ok(())
}

fn add_directory(target: &mut ArchiveTarget<'_>, name: &str) -> FsOpsResult<()> {
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    target
        .writer
        .add_directory(format!("{name}/"), options)
        .map_err(|err| FsOpsError::zip("archive.add_directory", target.destination, err))?;
    target.summary.directories += 1;
    target.mark_written(name);
    Ok(())
}

fn finish(mut target: ArchiveTarget<'_>) -> FsOpsResult<ArchiveSummary> {
    let file = target
        .writer
        .finish()
        .map_err(|err| FsOpsError::zip("archive.finish", target.destination, err))?;
    file.sync_all()
        .map_err(|err| FsOpsError::io("archive.sync", target.destination, err))?;
    Ok(target.summary)
}

fn file_options(metadata: &Metadata) -> FileOptions {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.len() >= u64::from(u32::MAX));
    #[cfg(unix)]
    let options = options.unix_permissions(metadata.permissions().mode() & 0o7777);
    options
}

fn entry_name(source: &Path, path: &Path) -> FsOpsResult<String> {
    let relative = path
        .strip_prefix(source)
        .map_err(|_| FsOpsError::InvalidInput {
            field: "entry_path",
            reason: "outside_source",
            value: Some(path.display().to_string()),
        })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or_else(|| FsOpsError::InvalidInput {
                    field: "entry_path",
                    reason: "non_utf8",
                    value: Some(path.display().to_string()),
                })?;
                segments.push(segment);
            }
            Component::CurDir => {}
            _ => {
                return Err(FsOpsError::InvalidInput {
                    field: "entry_path",
                    reason: "invalid_segment",
                    value: Some(path.display().to_string()),
                });
            }
        }
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use foldpack_test_support::fixtures::{read_archive, write_tree};
    use tempfile::TempDir;

    #[test]
    fn archives_nested_tree_with_relative_names() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("photos");
        write_tree(
            &source,
            &[
                ("cover.jpg", b"jpeg-bytes".as_slice()),
                ("2023/summer/beach.png", b"png-bytes".as_slice()),
                ("2023/notes.txt", "héllo wörld".as_bytes()),
            ],
        )?;
        let destination = temp.path().join("photos.zip");

        let summary = ZipArchiver::new().archive(&source, &destination)?;
        assert_eq!(summary.files, 3);
        assert_eq!(summary.directories, 0);
        assert_eq!(summary.archive_path, destination);

        let entries = read_archive(&destination)?;
        assert_eq!(
            entries.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["2023/notes.txt", "2023/summer/beach.png", "cover.jpg"]
        );
        assert_eq!(entries["cover.jpg"].data, b"jpeg-bytes");
        assert_eq!(entries["2023/notes.txt"].data, "héllo wörld".as_bytes());
        assert!(entries.values().all(|entry| entry.deflated));
        assert!(source.exists(), "archiving must not touch the source");
        Ok(())
    }

    #[test]
    fn empty_directories_are_kept_as_entries() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("project");
        fs::create_dir_all(source.join("build/cache"))?;
        fs::create_dir_all(source.join("src"))?;
        fs::write(source.join("src/main.rs"), b"fn main() {}")?;
        let destination = temp.path().join("project.zip");

        let summary = ZipArchiver::new().archive(&source, &destination)?;
        assert_eq!(summary.files, 1);
        assert_eq!(summary.directories, 1);

        let entries = read_archive(&destination)?;
        assert!(entries["build/cache/"].is_dir);
        assert!(!entries.contains_key("build/"));
        assert_eq!(entries["src/main.rs"].data, b"fn main() {}");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn directory_holding_only_skipped_entries_is_kept() -> Result<()> {
        let temp = TempDir::new()?;
        let outside = TempDir::new()?;
        let source = temp.path().join("proj");
        write_tree(&source, &[("a.txt", b"a".as_slice())])?;
        fs::create_dir(source.join("cache"))?;
        std::os::unix::fs::symlink(outside.path(), source.join("cache/link"))?;
        let destination = temp.path().join("proj.zip");

        let summary = ZipArchiver::new().archive(&source, &destination)?;
        assert_eq!(summary.files, 1);
        assert_eq!(summary.directories, 1);

        let entries = read_archive(&destination)?;
        assert_eq!(
            entries.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["a.txt", "cache/"]
        );
        assert!(entries["cache/"].is_dir);
        Ok(())
    }

    #[test]
    fn empty_folder_produces_valid_empty_archive() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("empty_but_real_dir");
        fs::create_dir(&source)?;
        let destination = temp.path().join("empty_but_real_dir.zip");

        let summary = ZipArchiver::new().archive(&source, &destination)?;
        assert_eq!(summary.files, 0);
        assert!(read_archive(&destination)?.is_empty());
        Ok(())
    }

    #[test]
    fn refuses_to_overwrite_existing_archive() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("docs");
        write_tree(&source, &[("a.txt", b"a".as_slice())])?;
        let destination = temp.path().join("docs.zip");
        fs::write(&destination, b"keep me")?;

        let result = ZipArchiver::new().archive(&source, &destination);
        assert!(matches!(
            result,
            Err(FsOpsError::Io {
                operation: "archive.create",
                ..
            })
        ));
        assert_eq!(fs::read(&destination)?, b"keep me");
        Ok(())
    }

    #[test]
    fn missing_destination_directory_fails() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("docs");
        write_tree(&source, &[("a.txt", b"a".as_slice())])?;
        let destination = temp.path().join("missing").join("docs.zip");

        assert!(ZipArchiver::new().archive(&source, &destination).is_err());
        assert!(source.join("a.txt").exists());
        Ok(())
    }

    #[test]
    fn rejects_non_directory_source() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("readme.txt");
        fs::write(&source, b"text")?;
        let destination = temp.path().join("readme.zip");

        let result = ZipArchiver::new().archive(&source, &destination);
        assert!(matches!(
            result,
            Err(FsOpsError::InvalidInput {
                reason: "not_a_directory",
                ..
            })
        ));
        assert!(!destination.exists());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_aborts_and_removes_partial_archive() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("broken");
        write_tree(&source, &[("a.txt", b"a".as_slice())])?;
        std::os::unix::fs::symlink(source.join("gone.txt"), source.join("z-link.txt"))?;
        let destination = temp.path().join("broken.zip");

        let result = ZipArchiver::new().archive(&source, &destination);
        assert!(matches!(
            result,
            Err(FsOpsError::Io {
                operation: "archive.resolve_link",
                ..
            })
        ));
        assert!(!destination.exists());
        assert!(source.join("a.txt").exists());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_archived_by_content() -> Result<()> {
        let temp = TempDir::new()?;
        let outside = temp.path().join("shared.txt");
        fs::write(&outside, b"shared")?;
        let source = temp.path().join("linked");
        fs::create_dir(&source)?;
        std::os::unix::fs::symlink(&outside, source.join("shared.txt"))?;
        std::os::unix::fs::symlink(temp.path(), source.join("loop"))?;
        let destination = temp.path().join("linked.zip");

        let summary = ZipArchiver::new().archive(&source, &destination)?;
        assert_eq!(summary.files, 1);
        let entries = read_archive(&destination)?;
        assert_eq!(entries["shared.txt"].data, b"shared");
        assert!(!entries.keys().any(|name| name.starts_with("loop")));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn unix_permissions_are_recorded() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("scripts");
        write_tree(&source, &[("run.sh", b"#!/bin/sh\n".as_slice())])?;
        fs::set_permissions(source.join("run.sh"), fs::Permissions::from_mode(0o750))?;
        let destination = temp.path().join("scripts.zip");

        ZipArchiver::new().archive(&source, &destination)?;
        let entries = read_archive(&destination)?;
        assert_eq!(entries["run.sh"].unix_mode.map(|mode| mode & 0o777), Some(0o750));
        Ok(())
    }

    #[test]
    fn entry_names_use_forward_slashes() -> Result<()> {
        let source = Path::new("root");
        let name = entry_name(source, &source.join("a").join("b").join("c.txt"))?;
        assert_eq!(name, "a/b/c.txt");
        assert!(entry_name(source, Path::new("elsewhere/c.txt")).is_err());
        Ok(())
    }
}
