//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::Path;

/// Read file contents with standardized error handling.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Open a file for streaming reads with standardized error handling.
pub fn open_file(path: &Path, operation: &str) -> Result<File> {
    File::open(path).map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path, operation: &str) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string()))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn read_file_succeeds_for_existing_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "test content").unwrap();

        let content = read_file(temp.path(), "test read").unwrap();
        assert!(content.contains("test content"));
    }

    #[test]
    fn read_file_returns_error_for_missing_file() {
        let result = read_file(Path::new("/nonexistent/path.txt"), "test read");
        let err = result.unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn open_file_streams_exact_payload() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&[0x50, 0x4b, 0x03, 0x04]).unwrap();

        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut open_file(temp.path(), "test open").unwrap(), &mut bytes)
            .unwrap();
        assert_eq!(bytes, vec![0x50, 0x4b, 0x03, 0x04]);
    }

    #[test]
    fn open_file_reports_missing_file() {
        let err = open_file(Path::new("/nonexistent/archive.zip"), "test open").unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn ensure_parent_dir_creates_nested_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("out/nested/archive.zip");

        ensure_parent_dir(&target, "prepare output").unwrap();
        assert!(dir.path().join("out/nested").is_dir());
    }

    #[test]
    fn ensure_parent_dir_accepts_bare_filename() {
        assert!(ensure_parent_dir(Path::new("archive.zip"), "prepare output").is_ok());
    }
}
