//! Folder-tree fixtures and archive readers.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipArchive};

/// One entry read back from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedEntry {
    /// Decompressed contents (empty for directories).
    pub data: Vec<u8>,
    /// Entry is a directory marker.
    pub is_dir: bool,
    /// Entry was stored with deflate.
    pub deflated: bool,
    /// Unix mode recorded in the entry, when present.
    pub unix_mode: Option<u32>,
}

/// Create `root` and write each `(relative path, contents)` pair beneath it.
///
/// # Errors
///
/// Returns an error if a directory or file cannot be created.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("create {}", root.display()))?;
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}

/// Read every file under `root`, keyed by `/`-separated relative path.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or a file cannot be read.
pub fn snapshot_tree(root: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let data = fs::read(entry.path())
            .with_context(|| format!("read {}", entry.path().display()))?;
        files.insert(name, data);
    }
    Ok(files)
}

/// Open a zip archive and read every entry, keyed by entry name.
///
/// # Errors
///
/// Returns an error if the archive is missing, corrupt, or contains duplicate names.
pub fn read_archive(path: &Path) -> Result<BTreeMap<String, ArchivedEntry>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("decode {}", path.display()))?;
    let mut entries = BTreeMap::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        let is_dir = entry.is_dir();
        let deflated = entry.compression() == CompressionMethod::Deflated;
        let unix_mode = entry.unix_mode();
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .with_context(|| format!("inflate {name}"))?;
        let archived = ArchivedEntry {
            data,
            is_dir,
            deflated,
            unix_mode,
        };
        if entries.insert(name.clone(), archived).is_some() {
            bail!("duplicate archive entry {name}");
        }
    }
    Ok(entries)
}

/// File entries of an archive as a name-to-contents map, for comparison with
/// [`snapshot_tree`].
///
/// # Errors
///
/// Returns an error if the archive cannot be read.
pub fn archive_files(path: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    Ok(read_archive(path)?
        .into_iter()
        .filter(|(_, entry)| !entry.is_dir)
        .map(|(name, entry)| (name, entry.data))
        .collect())
}

/// Sorted names of the immediate entries of `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn list_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = fs::read_dir(dir)
        .with_context(|| format!("list {}", dir.display()))?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    #[test]
    fn write_tree_and_snapshot_agree() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path().join("tree");
        write_tree(
            &root,
            &[("a.txt", b"a".as_slice()), ("nested/b.txt", b"bb".as_slice())],
        )?;

        let snapshot = snapshot_tree(&root)?;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["nested/b.txt"], b"bb");
        assert_eq!(list_names(&root)?, vec!["a.txt", "nested"]);
        Ok(())
    }

    #[test]
    fn read_archive_reports_entries() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("sample.zip");
        let mut writer = zip::ZipWriter::new(File::create(&path)?);
        writer.add_directory("empty/", FileOptions::default())?;
        writer.start_file(
            "x/y.txt",
            FileOptions::default().compression_method(CompressionMethod::Deflated),
        )?;
        writer.write_all(b"payload")?;
        writer.finish()?;

        let entries = read_archive(&path)?;
        assert!(entries["empty/"].is_dir);
        assert!(entries["x/y.txt"].deflated);
        assert_eq!(archive_files(&path)?["x/y.txt"], b"payload");
        Ok(())
    }
}
