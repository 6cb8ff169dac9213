//! Atomic file writes: write to a sibling temp file, then rename into place.
//!
//! A rename within the same directory is atomic on the filesystems this
//! crate targets (ext4, APFS, NTFS), so a reader never observes a
//! partially-written session or archive file.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::StorageError;

pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| io_err(path, source))?;

    let tmp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("archive"),
        nanoid::nanoid!(8)
    );
    let tmp_path = parent.join(tmp_name);

    fs::write(&tmp_path, bytes).map_err(|source| io_err(&tmp_path, source))?;
    fs::rename(&tmp_path, path).map_err(|source| io_err(path, source))?;
    Ok(())
}

pub(crate) fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(io_err(path, source)),
    }
}

pub(crate) fn io_err(path: &Path, source: io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deep/file.json");
        atomic_write(&path, b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn atomic_write_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        atomic_write(&path, b"data").unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn atomic_write_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn read_optional_returns_none_for_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert_eq!(read_optional(&path).unwrap(), None);
    }

    #[test]
    fn read_optional_returns_bytes_for_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        fs::write(&path, b"data").unwrap();
        assert_eq!(read_optional(&path).unwrap(), Some(b"data".to_vec()));
    }
}
