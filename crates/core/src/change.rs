//! [`Change`]: a single path's transition from one [`Entry`] state to another.

use crate::entry::Entry;
use serde::{Deserialize, Serialize};

/// A change to apply (or that was observed) at `path`.
///
/// `path == ""` denotes the synchronization root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub path: String,
    pub old: Option<Entry>,
    pub new: Option<Entry>,
}

/// The kind of transition a [`Change`] represents, derived from `old`/`new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Creation,
    Deletion,
    Modification,
    TypeChange,
}

impl Change {
    pub fn new(path: impl Into<String>, old: Option<Entry>, new: Option<Entry>) -> Self {
        Self {
            path: path.into(),
            old,
            new,
        }
    }

    pub fn creation(path: impl Into<String>, new: Entry) -> Self {
        Self::new(path, None, Some(new))
    }

    pub fn deletion(path: impl Into<String>, old: Entry) -> Self {
        Self::new(path, Some(old), None)
    }

    /// `old.kind() == new.kind()` (both present) is a modification;
    /// differing kinds is a type change; nil `old` is a creation; nil
    /// `new` is a deletion.
    pub fn kind(&self) -> ChangeKind {
        match (&self.old, &self.new) {
            (None, Some(_)) => ChangeKind::Creation,
            (Some(_), None) => ChangeKind::Deletion,
            (Some(old), Some(new)) => {
                if std::mem::discriminant(old) == std::mem::discriminant(new) {
                    ChangeKind::Modification
                } else {
                    ChangeKind::TypeChange
                }
            }
            (None, None) => ChangeKind::Modification, // degenerate no-op change
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// `true` when this change deletes a directory (used by the root-type
    /// and root-deletion safety gates).
    pub fn is_root_deletion(&self) -> bool {
        self.is_root() && self.new.is_none() && self.old.is_some()
    }

    pub fn is_root_type_change(&self) -> bool {
        self.is_root() && self.kind() == ChangeKind::TypeChange
    }
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
