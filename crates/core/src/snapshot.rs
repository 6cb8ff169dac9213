//! [`Snapshot`]: the result of scanning one endpoint.

use crate::entry::Entry;
use serde::{Deserialize, Serialize};

/// A scan result: an [`Entry`] tree plus aggregate metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub content: Option<Entry>,
    pub preserves_executability: bool,
    pub directories: u64,
    pub files: u64,
    pub symbolic_links: u64,
    pub total_file_size: u64,
}

impl Snapshot {
    pub fn empty(preserves_executability: bool) -> Self {
        Self {
            content: None,
            preserves_executability,
            directories: 0,
            files: 0,
            symbolic_links: 0,
            total_file_size: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_no_content_and_zero_counts() {
        let s = Snapshot::empty(true);
        assert!(s.content.is_none());
        assert!(s.preserves_executability);
        assert_eq!(s.directories, 0);
        assert_eq!(s.files, 0);
        assert_eq!(s.symbolic_links, 0);
        assert_eq!(s.total_file_size, 0);
    }
}
