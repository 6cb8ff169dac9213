//! Session record persistence: pretty-printed JSON, atomic write-then-rename
//! (spec §6.2).

use std::path::Path;

use duet_core::Session;

use crate::error::StorageError;
use crate::fs_util::{atomic_write, read_optional};

pub fn read_session(path: &Path) -> Result<Option<Session>, StorageError> {
    let bytes = match read_optional(path)? {
        Some(bytes) => bytes,
        None => return Ok(None),
    };
    let session: Session =
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
            path: path.display().to_string(),
            source,
        })?;
    Ok(Some(session))
}

pub fn write_session(path: &Path, session: &Session) -> Result<(), StorageError> {
    let bytes =
        serde_json::to_vec_pretty(session).map_err(|source| StorageError::Json {
            path: path.display().to_string(),
            source,
        })?;
    atomic_write(path, &bytes)
}

pub fn delete_session(path: &Path) -> Result<(), StorageError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(crate::fs_util::io_err(path, source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::session::Configuration;
    use tempfile::tempdir;

    fn sample() -> Session {
        Session::new("alpha:/data", "beta@host:/data", Configuration::default(), 1_000)
    }

    #[test]
    fn missing_session_reads_as_none() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("session.json");
        assert_eq!(read_session(&path).unwrap(), None);
    }

    #[test]
    fn roundtrips_through_disk() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("session.json");
        let session = sample();
        write_session(&path, &session).unwrap();
        assert_eq!(read_session(&path).unwrap(), Some(session));
    }

    #[test]
    fn written_file_is_pretty_printed() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("session.json");
        write_session(&path, &sample()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
    }

    #[test]
    fn delete_is_idempotent_on_missing_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("session.json");
        assert!(delete_session(&path).is_ok());
        assert!(delete_session(&path).is_ok());
    }

    #[test]
    fn delete_removes_existing_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("session.json");
        write_session(&path, &sample()).unwrap();
        delete_session(&path).unwrap();
        assert_eq!(read_session(&path).unwrap(), None);
    }
}
