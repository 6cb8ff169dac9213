//! [`Archive`]: the persisted ancestor snapshot.

use crate::change::Change;
use crate::entry::{Entry, EntryError};
use serde::{Deserialize, Serialize};

/// `{ content: Entry? }`, persisted to disk (see `duet-storage`). Must
/// satisfy [`Entry::validate_synchronizable`] whenever `content` is present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Archive {
    pub content: Option<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive content is not synchronizable: {0}")]
    NotSynchronizable(#[from] EntryError),
    #[error("change at {path:?} does not apply: expected old entry did not match archive content")]
    ChangeDoesNotApply { path: String },
}

impl Archive {
    pub fn empty() -> Self {
        Self { content: None }
    }

    pub fn new(content: Option<Entry>) -> Result<Self, ArchiveError> {
        let archive = Self { content };
        archive.validate()?;
        Ok(archive)
    }

    pub fn validate(&self) -> Result<(), ArchiveError> {
        if let Some(content) = &self.content {
            content.validate_synchronizable()?;
        }
        Ok(())
    }

    /// Apply a batch of ancestor changes (as produced by the reconciler) to
    /// this archive's content, returning the new archive. Changes are
    /// applied in order; each must find its declared `old` value at its
    /// path or the apply fails (spec §8 property 6: "the ancestor after a
    /// successful cycle equals `Apply(ancestor, ancestorChanges)`").
    pub fn apply(&self, changes: &[Change]) -> Result<Archive, ArchiveError> {
        let mut content = self.content.clone();
        for change in changes {
            content = apply_one(content, &change.path, &change.old, &change.new)?;
        }
        let archive = Archive { content };
        archive.validate()?;
        Ok(archive)
    }
}

fn apply_one(
    root: Option<Entry>,
    path: &str,
    expected_old: &Option<Entry>,
    new: &Option<Entry>,
) -> Result<Option<Entry>, ArchiveError> {
    if path.is_empty() {
        if &root != expected_old {
            return Err(ArchiveError::ChangeDoesNotApply {
                path: path.to_string(),
            });
        }
        return Ok(new.clone());
    }

    let (head, rest) = match path.split_once('/') {
        Some((h, r)) => (h, r),
        None => (path, ""),
    };

    let mut contents = match root {
        Some(Entry::Directory { contents }) => contents,
        _ => {
            return Err(ArchiveError::ChangeDoesNotApply {
                path: path.to_string(),
            })
        }
    };

    let child = contents.remove(head);
    let updated_child = apply_one(child, rest, expected_old, new)?;
    if let Some(updated_child) = updated_child {
        contents.insert(head.to_string(), updated_child);
    }

    Ok(Some(Entry::Directory { contents }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::test_support::*;

    #[test]
    fn empty_archive_has_no_content() {
        assert_eq!(Archive::empty().content, None);
    }

    #[test]
    fn new_rejects_unsynchronizable_content() {
        let dirty = dir(&[("a", Entry::Untracked)]);
        assert!(Archive::new(Some(dirty)).is_err());
    }

    #[test]
    fn apply_root_creation() {
        let archive = Archive::empty();
        let changes = vec![Change::creation("", file("1"))];
        let updated = archive.apply(&changes).unwrap();
        assert_eq!(updated.content, Some(file("1")));
    }

    #[test]
    fn apply_nested_creation_within_existing_directory() {
        let archive = Archive::new(Some(Entry::empty_directory())).unwrap();
        let changes = vec![Change::creation("a", file("1"))];
        let updated = archive.apply(&changes).unwrap();
        assert_eq!(updated.content, Some(dir(&[("a", file("1"))])));
    }

    #[test]
    fn apply_deletion_removes_path() {
        let archive = Archive::new(Some(dir(&[("a", file("1")), ("b", file("2"))]))).unwrap();
        let changes = vec![Change::deletion("a", file("1"))];
        let updated = archive.apply(&changes).unwrap();
        assert_eq!(updated.content, Some(dir(&[("b", file("2"))])));
    }

    #[test]
    fn apply_rejects_mismatched_old_value() {
        let archive = Archive::new(Some(file("1"))).unwrap();
        let changes = vec![Change::deletion("", file("WRONG"))];
        assert!(matches!(
            archive.apply(&changes),
            Err(ArchiveError::ChangeDoesNotApply { .. })
        ));
    }

    #[test]
    fn apply_refuses_to_produce_unsynchronizable_archive() {
        let archive = Archive::empty();
        let changes = vec![Change::creation("", Entry::Untracked)];
        assert!(archive.apply(&changes).is_err());
    }
}
