//! Archive persistence: a zero-byte file means "no ancestor"; anything else
//! is the JSON encoding of the ancestor [`Entry`] (spec §6.1).
//!
//! Plain `serde_json` of `Option<Entry>` can't express this: it would
//! serialize an empty ancestor directory and an absent ancestor identically
//! (`null` vs. `{"Directory":{"contents":{}}}` are both valid non-empty
//! JSON), and a naive "empty file means `None`" convention would then be
//! unable to tell "no ancestor yet" apart from "ancestor is an empty
//! directory" if we ever serialized the latter as nothing. Tying absence to
//! byte-length rather than to JSON content sidesteps that: the envelope
//! itself carries the distinction invariant 8 requires.

use std::path::Path;

use duet_core::{Archive, Entry};
use tracing::debug;

use crate::error::StorageError;
use crate::fs_util::{atomic_write, read_optional};

pub fn read_archive(path: &Path) -> Result<Archive, StorageError> {
    let bytes = match read_optional(path)? {
        Some(bytes) => bytes,
        None => {
            debug!(path = %path.display(), "no archive file, starting from empty ancestor");
            return Ok(Archive::empty());
        }
    };
    decode(path, &bytes)
}

pub fn write_archive(path: &Path, archive: &Archive) -> Result<(), StorageError> {
    let bytes = encode(path, archive)?;
    atomic_write(path, &bytes)
}

/// Delete the archive file, idempotently (spec §4.2 `halt(Terminate)`:
/// "deletes session + archive files").
pub fn delete_archive(path: &Path) -> Result<(), StorageError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(crate::fs_util::io_err(path, source)),
    }
}

fn encode(path: &Path, archive: &Archive) -> Result<Vec<u8>, StorageError> {
    match &archive.content {
        None => Ok(Vec::new()),
        Some(entry) => {
            serde_json::to_vec(entry).map_err(|source| StorageError::Json {
                path: path.display().to_string(),
                source,
            })
        }
    }
}

fn decode(path: &Path, bytes: &[u8]) -> Result<Archive, StorageError> {
    if bytes.is_empty() {
        return Ok(Archive::empty());
    }
    let content: Entry = serde_json::from_slice(bytes).map_err(|source| StorageError::Json {
        path: path.display().to_string(),
        source,
    })?;
    Archive::new(Some(content)).map_err(StorageError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::entry::test_support::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn absent_file_reads_as_empty_archive() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("archive");
        assert_eq!(read_archive(&path).unwrap(), Archive::empty());
    }

    #[test]
    fn empty_archive_writes_zero_bytes() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("archive");
        write_archive(&path, &Archive::empty()).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn empty_directory_ancestor_writes_nonzero_bytes() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("archive");
        let archive = Archive::new(Some(Entry::empty_directory())).unwrap();
        write_archive(&path, &archive).unwrap();
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn roundtrips_through_disk() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("archive");
        let archive = Archive::new(Some(dir(&[("a", file("1"))]))).unwrap();
        write_archive(&path, &archive).unwrap();
        assert_eq!(read_archive(&path).unwrap(), archive);
    }

    #[test]
    fn rejects_unsynchronizable_content_on_read() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("archive");
        let bytes = serde_json::to_vec(&Entry::Untracked).unwrap();
        fs::write(&path, bytes).unwrap();
        assert!(read_archive(&path).is_err());
    }

    #[test]
    fn delete_is_idempotent_on_missing_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("archive");
        assert!(delete_archive(&path).is_ok());
        assert!(delete_archive(&path).is_ok());
    }

    #[test]
    fn delete_removes_existing_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("archive");
        write_archive(&path, &Archive::empty()).unwrap();
        delete_archive(&path).unwrap();
        assert_eq!(read_archive(&path).unwrap(), Archive::empty());
    }
}
