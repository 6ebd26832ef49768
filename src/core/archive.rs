//! Directory archiver.
//!
//! Walks a source directory recursively and writes every regular file into a
//! single Deflate-compressed ZIP. Entry names are relative to the source
//! directory, `/`-separated and written in sorted order so two builds of the
//! same tree produce the same entry list.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::utils::io as fs_io;

/// A file selected for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Name inside the archive (relative, `/`-separated).
    pub name: String,
    /// Location on disk.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub path: String,
    pub source_dir: String,
    pub entries: Vec<String>,
    pub file_count: usize,
    pub bytes: u64,
    pub sha256: String,
}

/// Build the archive for `source` at `destination`.
///
/// Fails with `archive.source_missing` when `source` is absent or not a
/// directory and `archive.source_empty` when it holds no files. A partially
/// written destination is removed before the error is returned.
pub fn build(source: &Path, destination: &Path) -> Result<ArchiveSummary> {
    let entries = collect_files(source, Some(destination))?;
    if entries.is_empty() {
        return Err(Error::archive_source_empty(source.display().to_string()));
    }

    fs_io::ensure_parent_dir(destination, "create archive directory")?;

    log_status!(
        "archive",
        "Writing {} file(s) from {} to {}",
        entries.len(),
        source.display(),
        destination.display()
    );

    if let Err(err) = write_archive(&entries, destination) {
        let _ = fs::remove_file(destination);
        return Err(err);
    }

    let bytes = fs::metadata(destination)
        .map(|m| m.len())
        .map_err(|e| Error::archive_write_failed(destination.display().to_string(), e.to_string()))?;
    let sha256 = file_sha256(destination)?;

    Ok(ArchiveSummary {
        path: destination.display().to_string(),
        source_dir: source.display().to_string(),
        file_count: entries.len(),
        entries: entries.into_iter().map(|e| e.name).collect(),
        bytes,
        sha256,
    })
}

/// Collect every regular file under `source`, sorted by archive name.
///
/// Symlinked directories are not descended into. `exclude` (typically the
/// archive's own destination) is skipped if it lies inside the tree.
pub fn collect_files(source: &Path, exclude: Option<&Path>) -> Result<Vec<ArchiveEntry>> {
    if !source.is_dir() {
        return Err(Error::archive_source_missing(source.display().to_string()));
    }

    let exclude = exclude.map(absolute_path);
    let mut entries = Vec::new();
    walk_recursive(source, source, exclude.as_deref(), &mut entries).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("walk {}", source.display())))
    })?;

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Read back the file entry names stored in an archive.
pub fn list_entries(archive_path: &Path) -> Result<Vec<String>> {
    let file = File::open(archive_path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("open {}", archive_path.display())))
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", archive_path.display())))
    })?;

    let mut names = Vec::with_capacity(archive.len());
    for idx in 0..archive.len() {
        let entry = archive.by_index(idx).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read {}", archive_path.display())))
        })?;
        if !entry.is_dir() {
            names.push(entry.name().to_string());
        }
    }
    Ok(names)
}

fn walk_recursive(
    root: &Path,
    dir: &Path,
    exclude: Option<&Path>,
    entries: &mut Vec<ArchiveEntry>,
) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_recursive(root, &path, exclude, entries)?;
            continue;
        }

        let is_file = file_type.is_file()
            || (file_type.is_symlink() && fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false));
        if !is_file {
            continue;
        }

        if exclude.is_some_and(|ex| absolute_path(&path) == ex) {
            continue;
        }

        if let Some(name) = entry_name(root, &path) {
            entries.push(ArchiveEntry { name, path });
        }
    }
    Ok(())
}

fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn write_archive(entries: &[ArchiveEntry], destination: &Path) -> Result<()> {
    let dest = destination.display().to_string();
    let write_err = |e: &dyn std::fmt::Display| Error::archive_write_failed(dest.clone(), e.to_string());

    let file = File::create(destination).map_err(|e| write_err(&e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    for entry in entries {
        let options = entry_options(&entry.path);
        zip.start_file(entry.name.as_str(), options)
            .map_err(|e| write_err(&e))?;

        let mut source = File::open(&entry.path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read {}", entry.path.display())))
        })?;
        io::copy(&mut source, &mut zip).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read {}", entry.path.display())))
        })?;
    }

    let mut writer = zip.finish().map_err(|e| write_err(&e))?;
    io::Write::flush(&mut writer).map_err(|e| write_err(&e))?;
    Ok(())
}

fn entry_options(path: &Path) -> FileOptions {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            return options.unix_permissions(meta.permissions().mode());
        }
    }

    #[cfg(not(unix))]
    let _ = path;

    options
}

fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some("hash archive".to_string())))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| Error::internal_io(e.to_string(), Some("hash archive".to_string())))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Best-effort absolute form of a path that may not exist yet.
fn absolute_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent
                .canonicalize()
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}
