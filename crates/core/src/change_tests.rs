use super::*;
use crate::entry::test_support::*;

#[test]
fn creation_has_nil_old() {
    let c = Change::creation("a", file("1"));
    assert_eq!(c.kind(), ChangeKind::Creation);
    assert!(c.old.is_none());
}

#[test]
fn deletion_has_nil_new() {
    let c = Change::deletion("a", file("1"));
    assert_eq!(c.kind(), ChangeKind::Deletion);
    assert!(c.new.is_none());
}

#[test]
fn same_kind_both_present_is_modification() {
    let c = Change::new("a", Some(file("1")), Some(file("2")));
    assert_eq!(c.kind(), ChangeKind::Modification);
}

#[test]
fn differing_kind_both_present_is_type_change() {
    let c = Change::new(
        "a",
        Some(file("1")),
        Some(Entry::symbolic_link("target")),
    );
    assert_eq!(c.kind(), ChangeKind::TypeChange);
}

#[test]
fn empty_path_is_root() {
    let c = Change::creation("", file("1"));
    assert!(c.is_root());
    let c2 = Change::creation("a", file("1"));
    assert!(!c2.is_root());
}

#[test]
fn root_deletion_detection() {
    let c = Change::deletion("", dir(&[("a", file("1"))]));
    assert!(c.is_root_deletion());
    let non_root = Change::deletion("a", file("1"));
    assert!(!non_root.is_root_deletion());
}

#[test]
fn root_type_change_detection() {
    let c = Change::new(
        "",
        Some(dir(&[("a", file("1"))])),
        Some(file("2")),
    );
    assert!(c.is_root_type_change());
    let modification = Change::new("", Some(file("1")), Some(file("2")));
    assert!(!modification.is_root_type_change());
}
