//! [`Conflict`]: mutually incompatible per-side changes at a root path.

use crate::change::Change;
use serde::{Deserialize, Serialize};

/// Always represents mutually incompatible changes at `root` — the
/// reconciler never emits a `Conflict` alongside a transition for the same
/// root on either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub root: String,
    pub alpha_changes: Vec<Change>,
    pub beta_changes: Vec<Change>,
}

impl Conflict {
    pub fn new(root: impl Into<String>, alpha_changes: Vec<Change>, beta_changes: Vec<Change>) -> Self {
        Self {
            root: root.into(),
            alpha_changes,
            beta_changes,
        }
    }

    pub fn is_root(&self) -> bool {
        self.root.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::test_support::file;

    #[test]
    fn root_conflict_has_empty_root_path() {
        let conflict = Conflict::new(
            "",
            vec![Change::creation("", file("1"))],
            vec![Change::creation("", file("2"))],
        );
        assert!(conflict.is_root());
    }

    #[test]
    fn nested_conflict_carries_its_path() {
        let conflict = Conflict::new(
            "file",
            vec![Change::creation("file", file("1"))],
            vec![Change::creation("file", file("2"))],
        );
        assert_eq!(conflict.root, "file");
        assert!(!conflict.is_root());
    }
}
