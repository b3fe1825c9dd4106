//! Filesystem operations behind a folder job: archive path allocation, zip
//! archiving of a directory tree, and recursive removal.
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
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

pub mod allocate;
pub mod archive;
pub mod error;
pub mod remove;

pub use allocate::{ARCHIVE_EXTENSION, allocate_archive_path};
pub use archive::{ArchiveSummary, FolderArchiver, ZipArchiver};
pub use error::{FsOpsError, FsOpsResult};
pub use remove::{FolderRemover, TreeRemover};

use std::path::Path;

/// Display name for a folder path, used in log lines.
pub(crate) fn folder_label(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
