//! Safety gates evaluated before reconciliation each cycle (spec §4.2 step
//! 6). Each gate, once tripped, sends the controller into a terminal
//! `HaltedOn*` status for the rest of the session.

use duet_core::{Change, Entry};

/// Root was a directory with at least two children, remains a directory on
/// both sides, and exactly one side has since been emptied.
///
/// The `>= 2` threshold (rather than `>= 1`) is load-bearing: a
/// single-child root that loses its one child looks identical, from the
/// ancestor's perspective, to a plain deletion-and-recreation — only a
/// root that previously had real fan-out can unambiguously signal "someone
/// emptied this on purpose."
pub fn one_endpoint_emptied_root(
    ancestor: Option<&Entry>,
    alpha: Option<&Entry>,
    beta: Option<&Entry>,
) -> bool {
    let Some(Entry::Directory { contents: ancestor_contents }) = ancestor else {
        return false;
    };
    if ancestor_contents.len() < 2 {
        return false;
    }
    let (Some(Entry::Directory { contents: alpha_contents }), Some(Entry::Directory { contents: beta_contents })) =
        (alpha, beta)
    else {
        return false;
    };
    let alpha_emptied = alpha_contents.is_empty();
    let beta_emptied = beta_contents.is_empty();
    alpha_emptied != beta_emptied
}

/// A root-path change that deletes the root entirely.
pub fn contains_root_deletion(transitions: &[Change]) -> bool {
    transitions.iter().any(Change::is_root_deletion)
}

/// A root-path change that swaps the root's entry kind (e.g. file → directory).
pub fn contains_root_type_change(transitions: &[Change]) -> bool {
    transitions.iter().any(Change::is_root_type_change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::entry::test_support::*;

    fn two_child_dir() -> Entry {
        dir(&[("a", file("1")), ("b", file("2"))])
    }

    #[test]
    fn detects_one_side_emptied() {
        let ancestor = two_child_dir();
        let alpha = Entry::empty_directory();
        let beta = two_child_dir();
        assert!(one_endpoint_emptied_root(Some(&ancestor), Some(&alpha), Some(&beta)));
    }

    #[test]
    fn does_not_trigger_when_both_sides_emptied() {
        let ancestor = two_child_dir();
        let alpha = Entry::empty_directory();
        let beta = Entry::empty_directory();
        assert!(!one_endpoint_emptied_root(Some(&ancestor), Some(&alpha), Some(&beta)));
    }

    #[test]
    fn does_not_trigger_below_the_two_child_threshold() {
        let ancestor = dir(&[("a", file("1"))]);
        let alpha = Entry::empty_directory();
        let beta = dir(&[("a", file("1"))]);
        assert!(!one_endpoint_emptied_root(Some(&ancestor), Some(&alpha), Some(&beta)));
    }

    #[test]
    fn does_not_trigger_when_a_side_changed_type() {
        let ancestor = two_child_dir();
        let alpha = file("1");
        let beta = two_child_dir();
        assert!(!one_endpoint_emptied_root(Some(&ancestor), Some(&alpha), Some(&beta)));
    }

    #[test]
    fn detects_root_deletion() {
        let transitions = vec![Change::deletion("", file("1"))];
        assert!(contains_root_deletion(&transitions));
    }

    #[test]
    fn ignores_non_root_deletion() {
        let transitions = vec![Change::deletion("nested", file("1"))];
        assert!(!contains_root_deletion(&transitions));
    }

    #[test]
    fn detects_root_type_change() {
        let transitions = vec![Change::new("", Some(file("1")), Some(Entry::empty_directory()))];
        assert!(contains_root_type_change(&transitions));
    }

    #[test]
    fn ignores_root_modification_of_same_kind() {
        let transitions = vec![Change::new("", Some(file("1")), Some(file("2")))];
        assert!(!contains_root_type_change(&transitions));
    }
}
