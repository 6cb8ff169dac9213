//! The [`Entry`] tree: an immutable, hierarchical snapshot of filesystem content.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed-length content digest (SHA-256).
pub type Digest = [u8; 32];

/// A node in a content tree.
///
/// `Directory` children are keyed by name in a [`BTreeMap`] for deterministic
/// iteration; the data model itself treats the mapping as unordered (spec
/// §3) — ordering is an implementation convenience for comparison/tests,
/// never an observable contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    Directory { contents: BTreeMap<String, Entry> },
    File { digest: Digest, executable: bool },
    SymbolicLink { target: String },
    /// Scanner encountered content outside the synchronizable subset
    /// (e.g. an absolute or tree-escaping symlink under portable mode).
    Untracked,
    /// Scanner could not classify the content; `problem` is a diagnostic.
    Problematic { problem: String },
}

/// Reasons an [`Entry`] tree fails the invariants required of a [`Entry`]
/// in general, or of a *synchronizable* entry (archive content) specifically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    #[error("empty child name at {path:?}")]
    EmptyName { path: String },
    #[error("child name containing '/' at {path:?}: {name:?}")]
    SlashInName { path: String, name: String },
    #[error("child name is '.' or '..' at {path:?}")]
    DotName { path: String },
    #[error("non-directory entry with non-empty contents (impossible to construct safely, reported defensively) at {path:?}")]
    NonDirectoryWithContents { path: String },
    #[error("untracked content at {path:?} is not synchronizable")]
    Untracked { path: String },
    #[error("problematic content at {path:?} is not synchronizable: {problem}")]
    Problematic { path: String, problem: String },
}

impl Entry {
    pub fn directory(contents: BTreeMap<String, Entry>) -> Self {
        Entry::Directory { contents }
    }

    pub fn empty_directory() -> Self {
        Entry::Directory {
            contents: BTreeMap::new(),
        }
    }

    pub fn file(digest: Digest, executable: bool) -> Self {
        Entry::File { digest, executable }
    }

    pub fn symbolic_link(target: impl Into<String>) -> Self {
        Entry::SymbolicLink {
            target: target.into(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory { .. })
    }

    pub fn is_untracked_or_problematic(&self) -> bool {
        matches!(self, Entry::Untracked | Entry::Problematic { .. })
    }

    /// Child map, if this is a directory.
    pub fn contents(&self) -> Option<&BTreeMap<String, Entry>> {
        match self {
            Entry::Directory { contents } => Some(contents),
            _ => None,
        }
    }

    /// Number of direct children, or 0 for non-directories.
    pub fn child_count(&self) -> usize {
        self.contents().map(|c| c.len()).unwrap_or(0)
    }

    /// Validate structural invariants recursively (child name well-formedness;
    /// non-directories never carry contents — trivially true given the enum
    /// shape, checked anyway so callers that hand-build maps via
    /// deserialization catch name violations early).
    pub fn validate(&self) -> Result<(), EntryError> {
        self.validate_at("")
    }

    fn validate_at(&self, path: &str) -> Result<(), EntryError> {
        if let Entry::Directory { contents } = self {
            for (name, child) in contents {
                if name.is_empty() {
                    return Err(EntryError::EmptyName {
                        path: path.to_string(),
                    });
                }
                if name.contains('/') {
                    return Err(EntryError::SlashInName {
                        path: path.to_string(),
                        name: name.clone(),
                    });
                }
                if name == "." || name == ".." {
                    return Err(EntryError::DotName {
                        path: path.to_string(),
                    });
                }
                let child_path = if path.is_empty() {
                    name.clone()
                } else {
                    format!("{path}/{name}")
                };
                child.validate_at(&child_path)?;
            }
        }
        Ok(())
    }

    /// An entry is synchronizable if no Untracked/Problematic node exists
    /// anywhere beneath it (spec §3). Required before an `Entry` may become
    /// archive content.
    pub fn validate_synchronizable(&self) -> Result<(), EntryError> {
        self.validate_synchronizable_at("")
    }

    fn validate_synchronizable_at(&self, path: &str) -> Result<(), EntryError> {
        match self {
            Entry::Untracked => Err(EntryError::Untracked {
                path: path.to_string(),
            }),
            Entry::Problematic { problem } => Err(EntryError::Problematic {
                path: path.to_string(),
                problem: problem.clone(),
            }),
            Entry::Directory { contents } => {
                for (name, child) in contents {
                    let child_path = if path.is_empty() {
                        name.clone()
                    } else {
                        format!("{path}/{name}")
                    };
                    child.validate_synchronizable_at(&child_path)?;
                }
                Ok(())
            }
            Entry::File { .. } | Entry::SymbolicLink { .. } => Ok(()),
        }
    }

    pub fn is_synchronizable(&self) -> bool {
        self.validate_synchronizable().is_ok()
    }

    /// Structural equality ignoring executability — used when propagating
    /// content across endpoints that disagree on `preservesExecutability`
    /// (spec §4.1 point 5), where the controller normalizes executability
    /// *before* calling the reconciler, so this helper exists purely for
    /// that one normalization step rather than general comparisons.
    pub fn equal_ignoring_executability(&self, other: &Entry) -> bool {
        match (self, other) {
            (Entry::File { digest: d1, .. }, Entry::File { digest: d2, .. }) => d1 == d2,
            (
                Entry::Directory { contents: c1 },
                Entry::Directory { contents: c2 },
            ) => {
                c1.len() == c2.len()
                    && c1.iter().all(|(name, child)| {
                        c2.get(name)
                            .is_some_and(|other_child| child.equal_ignoring_executability(other_child))
                    })
            }
            _ => self == other,
        }
    }

    /// Return a copy of `self` with executability taken from `source` at
    /// every file path present in both trees (spec §4.1 point 5:
    /// "the controller propagates executability from the preserving side to
    /// the non-preserving side before reconciliation"). Paths that diverge
    /// in shape are left as-is; the reconciler will surface genuine content
    /// differences as changes/conflicts on its own.
    pub fn propagate_executability_from(&self, source: &Entry) -> Entry {
        match (self, source) {
            (Entry::File { digest, .. }, Entry::File { executable, .. }) => Entry::File {
                digest: *digest,
                executable: *executable,
            },
            (Entry::Directory { contents }, Entry::Directory { contents: source_contents }) => {
                let merged = contents
                    .iter()
                    .map(|(name, child)| {
                        let updated = match source_contents.get(name) {
                            Some(source_child) => child.propagate_executability_from(source_child),
                            None => child.clone(),
                        };
                        (name.clone(), updated)
                    })
                    .collect();
                Entry::Directory { contents: merged }
            }
            _ => self.clone(),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;

    /// Digest built from a short label, for tests where the exact bytes
    /// don't matter as long as two equal labels produce equal digests.
    pub fn digest_for(label: &str) -> Digest {
        use sha2::{Digest as _, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(label.as_bytes());
        hasher.finalize().into()
    }

    pub fn file(label: &str) -> Entry {
        Entry::file(digest_for(label), false)
    }

    pub fn executable_file(label: &str) -> Entry {
        Entry::file(digest_for(label), true)
    }

    pub fn dir(children: &[(&str, Entry)]) -> Entry {
        Entry::directory(
            children
                .iter()
                .map(|(name, entry)| (name.to_string(), entry.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
