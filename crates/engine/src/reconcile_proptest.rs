use super::*;
use duet_core::entry::test_support::digest_for;
use duet_core::SynchronizationMode;
use proptest::prelude::*;

fn arb_digest() -> impl Strategy<Value = duet_core::Digest> {
    (0u8..4).prop_map(|n| digest_for(&n.to_string()))
}

fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![Just("a".to_string()), Just("b".to_string()), Just("c".to_string())]
}

fn arb_entry(depth: u32) -> BoxedStrategy<Entry> {
    let leaf = prop_oneof![
        arb_digest().prop_map(|d| Entry::File { digest: d, executable: false }),
        arb_digest().prop_map(|d| Entry::File { digest: d, executable: true }),
        Just(Entry::SymbolicLink { target: "target".to_string() }),
    ];
    if depth == 0 {
        return leaf.boxed();
    }
    let recurse = prop::collection::btree_map(arb_name(), arb_entry(depth - 1), 0..3)
        .prop_map(|contents| Entry::Directory { contents });
    prop_oneof![leaf, recurse].boxed()
}

fn arb_optional_entry(depth: u32) -> impl Strategy<Value = Option<Entry>> {
    prop_oneof![Just(None), arb_entry(depth).prop_map(Some)]
}

fn arb_mode() -> impl Strategy<Value = SynchronizationMode> {
    prop_oneof![
        Just(SynchronizationMode::TwoWaySafe),
        Just(SynchronizationMode::TwoWayResolved),
        Just(SynchronizationMode::OneWaySafe),
        Just(SynchronizationMode::OneWayReplica),
    ]
}

fn conflict_roots(result: &Reconciliation) -> Vec<&str> {
    result.conflicts.iter().map(|c| c.root.as_str()).collect()
}

fn transitioned_paths(result: &Reconciliation) -> Vec<&str> {
    result
        .alpha_transitions
        .iter()
        .chain(result.beta_transitions.iter())
        .map(|c| c.path.as_str())
        .collect()
}

proptest! {
    #[test]
    fn reconcile_is_deterministic(
        ancestor in arb_optional_entry(2),
        alpha in arb_optional_entry(2),
        beta in arb_optional_entry(2),
        mode in arb_mode(),
    ) {
        let first = reconcile(ancestor.as_ref(), alpha.as_ref(), beta.as_ref(), mode);
        let second = reconcile(ancestor.as_ref(), alpha.as_ref(), beta.as_ref(), mode);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn agreeing_sides_never_conflict_or_transition(
        ancestor in arb_optional_entry(2),
        alpha in arb_optional_entry(2),
        mode in arb_mode(),
    ) {
        // alpha == beta by construction
        let result = reconcile(ancestor.as_ref(), alpha.as_ref(), alpha.as_ref(), mode);
        prop_assert!(result.conflicts.is_empty());
        prop_assert!(result.alpha_transitions.is_empty());
        prop_assert!(result.beta_transitions.is_empty());
    }

    #[test]
    fn resolved_modes_never_emit_conflicts(
        ancestor in arb_optional_entry(2),
        alpha in arb_optional_entry(2),
        beta in arb_optional_entry(2),
    ) {
        let resolved = reconcile(ancestor.as_ref(), alpha.as_ref(), beta.as_ref(), SynchronizationMode::TwoWayResolved);
        prop_assert!(resolved.conflicts.is_empty());
        let replica = reconcile(ancestor.as_ref(), alpha.as_ref(), beta.as_ref(), SynchronizationMode::OneWayReplica);
        prop_assert!(replica.conflicts.is_empty());
    }

    #[test]
    fn one_way_modes_never_write_to_alpha(
        ancestor in arb_optional_entry(2),
        alpha in arb_optional_entry(2),
        beta in arb_optional_entry(2),
    ) {
        let safe = reconcile(ancestor.as_ref(), alpha.as_ref(), beta.as_ref(), SynchronizationMode::OneWaySafe);
        prop_assert!(safe.alpha_transitions.is_empty());
        let replica = reconcile(ancestor.as_ref(), alpha.as_ref(), beta.as_ref(), SynchronizationMode::OneWayReplica);
        prop_assert!(replica.alpha_transitions.is_empty());
    }

    #[test]
    fn a_path_is_never_both_conflicted_and_transitioned(
        ancestor in arb_optional_entry(2),
        alpha in arb_optional_entry(2),
        beta in arb_optional_entry(2),
        mode in arb_mode(),
    ) {
        let result = reconcile(ancestor.as_ref(), alpha.as_ref(), beta.as_ref(), mode);
        let roots = conflict_roots(&result);
        let paths = transitioned_paths(&result);
        for root in &roots {
            prop_assert!(!paths.contains(root));
        }
    }
}
