//! The reconciler: a pure function from `(ancestor, alpha, beta, mode)` to
//! the changes needed to bring both sides into agreement (spec §4.1).
//!
//! Exposed as a single entry point, [`reconcile`], callable without any
//! I/O — matching the "reconciler is total" failure model — so the
//! quantified properties in spec §8 can be proptest subjects directly.

use std::collections::BTreeSet;

use duet_core::{Change, Conflict, Entry, SynchronizationMode};

/// Everything a cycle needs to apply after reconciling one `(ancestor,
/// alpha, beta)` triple: the ancestor's own advancement, the transitions
/// each side must apply, and any irreconcilable disagreements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub ancestor_changes: Vec<Change>,
    pub alpha_transitions: Vec<Change>,
    pub beta_transitions: Vec<Change>,
    pub conflicts: Vec<Conflict>,
}

impl Reconciliation {
    fn empty() -> Self {
        Self::default()
    }
}

/// Reconcile one session's current triple of trees under `mode`.
///
/// Recurses with an explicit path accumulator (joined with `/` only when a
/// change or conflict is actually emitted) rather than string concatenation
/// at every level, keeping the common "nothing changed here" case
/// allocation-free below the root.
pub fn reconcile(
    ancestor: Option<&Entry>,
    alpha: Option<&Entry>,
    beta: Option<&Entry>,
    mode: SynchronizationMode,
) -> Reconciliation {
    let mut out = Reconciliation::empty();
    reconcile_at("", ancestor, alpha, beta, mode, &mut out);
    out
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn is_unsynchronizable(entry: Option<&Entry>) -> bool {
    matches!(entry, Some(Entry::Untracked) | Some(Entry::Problematic { .. }))
}

fn as_directory_contents(entry: Option<&Entry>) -> Option<&std::collections::BTreeMap<String, Entry>> {
    match entry {
        Some(Entry::Directory { contents }) => Some(contents),
        _ => None,
    }
}

fn emit_conflict(
    path: &str,
    ancestor: Option<&Entry>,
    alpha: Option<&Entry>,
    beta: Option<&Entry>,
    out: &mut Reconciliation,
) {
    out.conflicts.push(Conflict::new(
        path,
        vec![Change::new(path, ancestor.cloned(), alpha.cloned())],
        vec![Change::new(path, ancestor.cloned(), beta.cloned())],
    ));
}

fn reconcile_at(
    path: &str,
    ancestor: Option<&Entry>,
    alpha: Option<&Entry>,
    beta: Option<&Entry>,
    mode: SynchronizationMode,
    out: &mut Reconciliation,
) {
    // 1. Trivial agreement (spec §4.1 point 1): equal subtrees need no
    // recursion, only an ancestor catch-up if it's the one that's stale.
    if alpha == beta {
        if ancestor != alpha {
            out.ancestor_changes
                .push(Change::new(path, ancestor.cloned(), alpha.cloned()));
        }
        return;
    }

    match mode {
        SynchronizationMode::TwoWaySafe | SynchronizationMode::TwoWayResolved => {
            reconcile_two_way(path, ancestor, alpha, beta, mode, out)
        }
        SynchronizationMode::OneWaySafe => reconcile_one_way_safe(path, ancestor, alpha, beta, out),
        SynchronizationMode::OneWayReplica => {
            reconcile_one_way_replica(path, ancestor, alpha, beta, out)
        }
    }
}

// --- Two-way (Safe and Resolved) ---------------------------------------

fn reconcile_two_way(
    path: &str,
    ancestor: Option<&Entry>,
    alpha: Option<&Entry>,
    beta: Option<&Entry>,
    mode: SynchronizationMode,
    out: &mut Reconciliation,
) {
    if let (Some(Entry::Directory { contents: ac }), Some(Entry::Directory { contents: bc })) =
        (alpha, beta)
    {
        recurse_directories(path, ancestor, ac, bc, mode, out);
        return;
    }
    two_way_leaf(path, ancestor, alpha, beta, mode.is_resolved(), out);
}

fn recurse_directories(
    path: &str,
    ancestor: Option<&Entry>,
    alpha_contents: &std::collections::BTreeMap<String, Entry>,
    beta_contents: &std::collections::BTreeMap<String, Entry>,
    mode: SynchronizationMode,
    out: &mut Reconciliation,
) {
    // §4.1 point 6: directory existence is a value handled at the parent;
    // its contents are reconciled within. Both sides already agree the
    // directory exists here (both are `Entry::Directory`); only emit an
    // ancestor shell change if the ancestor didn't already know that.
    if !matches!(ancestor, Some(Entry::Directory { .. })) {
        out.ancestor_changes.push(Change::new(
            path,
            ancestor.cloned(),
            Some(Entry::empty_directory()),
        ));
    }

    let ancestor_contents = as_directory_contents(ancestor);
    let mut names: BTreeSet<&str> = BTreeSet::new();
    names.extend(alpha_contents.keys().map(String::as_str));
    names.extend(beta_contents.keys().map(String::as_str));
    if let Some(anc) = ancestor_contents {
        names.extend(anc.keys().map(String::as_str));
    }

    for name in names {
        let child_path = join_path(path, name);
        let ancestor_child = ancestor_contents.and_then(|m| m.get(name));
        let alpha_child = alpha_contents.get(name);
        let beta_child = beta_contents.get(name);
        reconcile_at(&child_path, ancestor_child, alpha_child, beta_child, mode, out);
    }
}

/// Leaf-level two-way disagreement: `alpha != beta`, and they aren't both
/// directories (that case recurses instead). Implements the
/// deletion-vs-modification bias (§4.1 point 3) ahead of the
/// Safe/Resolved conflict-vs-alpha-wins split (§4.1 point 5), and the
/// unsynchronizable-content guard (§4.1 point 4).
fn two_way_leaf(
    path: &str,
    ancestor: Option<&Entry>,
    alpha: Option<&Entry>,
    beta: Option<&Entry>,
    resolved: bool,
    out: &mut Reconciliation,
) {
    let alpha_changed = alpha != ancestor;
    let beta_changed = beta != ancestor;

    // "Changes beat deletions" — always, regardless of mode.
    let (winner, winner_is_alpha) =
        if alpha.is_none() && ancestor.is_some() && beta_changed && beta.is_some() {
            (beta, false)
        } else if beta.is_none() && ancestor.is_some() && alpha_changed && alpha.is_some() {
            (alpha, true)
        } else if !alpha_changed {
            (beta, false)
        } else if !beta_changed {
            (alpha, true)
        } else if resolved {
            (alpha, true)
        } else {
            emit_conflict(path, ancestor, alpha, beta, out);
            return;
        };

    if is_unsynchronizable(winner) {
        if resolved {
            if winner_is_alpha {
                // Alpha's own edit is the one that's broken; alpha still
                // wins nominally, but garbage can't be propagated or
                // recorded. Leave everything as-is until alpha is fixed.
                return;
            }
            // Beta isn't authoritative in resolved mode; revert it to
            // alpha's current (synchronizable) value instead of
            // propagating its broken content.
            revert(path, beta, alpha, ancestor, false, out);
            return;
        }
        emit_conflict(path, ancestor, alpha, beta, out);
        return;
    }

    // The transition's `old` is the receiving side's own current value,
    // not the ancestor's — it describes what that side actually holds
    // right now, which is what the transition is replacing.
    let transition_old = if winner_is_alpha { beta } else { alpha };
    let change = Change::new(path, transition_old.cloned(), winner.cloned());
    if winner_is_alpha {
        out.beta_transitions.push(change);
    } else {
        out.alpha_transitions.push(change);
    }
    out.ancestor_changes
        .push(Change::new(path, ancestor.cloned(), winner.cloned()));
}

fn revert(
    path: &str,
    current: Option<&Entry>,
    good_value: Option<&Entry>,
    ancestor: Option<&Entry>,
    revert_alpha: bool,
    out: &mut Reconciliation,
) {
    let change = Change::new(path, current.cloned(), good_value.cloned());
    if revert_alpha {
        out.alpha_transitions.push(change);
    } else {
        out.beta_transitions.push(change);
    }
    out.ancestor_changes
        .push(Change::new(path, ancestor.cloned(), good_value.cloned()));
}

// --- One-way safe --------------------------------------------------------

fn reconcile_one_way_safe(
    path: &str,
    ancestor: Option<&Entry>,
    alpha: Option<&Entry>,
    beta: Option<&Entry>,
    out: &mut Reconciliation,
) {
    if let (Some(Entry::Directory { contents: ac }), Some(Entry::Directory { contents: bc })) =
        (alpha, beta)
    {
        recurse_directories(path, ancestor, ac, bc, SynchronizationMode::OneWaySafe, out);
        return;
    }

    let alpha_changed = alpha != ancestor;
    let beta_changed = beta != ancestor;

    if !alpha_changed {
        // Beta's unilateral change is invisible to one-way-safe: pure
        // creations from nothing are left alone, and beta-only deletions
        // are never replayed onto alpha.
        return;
    }

    if !beta_changed {
        // Standard α→β flow: beta hasn't diverged, so it's safe to replay
        // alpha's change onto it.
        propagate_one_way(path, ancestor, alpha, beta, out);
        return;
    }

    if alpha.is_none() {
        // Alpha's deletion wins over a concurrent beta modification per
        // the deletion/modification bias, but OneWaySafe never writes to
        // alpha and must not destroy beta's independent edit either: the
        // ancestor simply follows alpha's deletion and beta's divergence
        // is left untouched.
        out.ancestor_changes
            .push(Change::new(path, ancestor.cloned(), None));
        return;
    }

    if beta.is_none() {
        // Alpha modified, beta merely deleted (no competing content of
        // its own): overwrite the deletion with alpha's new content.
        propagate_one_way(path, ancestor, alpha, beta, out);
        return;
    }

    // Both sides hold genuinely different content and alpha changed:
    // propagating alpha would clobber beta's own independent edit.
    emit_conflict(path, ancestor, alpha, beta, out);
}

fn propagate_one_way(
    path: &str,
    ancestor: Option<&Entry>,
    alpha: Option<&Entry>,
    beta: Option<&Entry>,
    out: &mut Reconciliation,
) {
    if is_unsynchronizable(alpha) {
        return;
    }
    // `old` is beta's own current value (what's actually being replaced on
    // the receiving side), not the ancestor's — e.g. when beta has been
    // deleted this must be a creation (`old: None`), not a modification
    // from the ancestor's stale content.
    out.beta_transitions
        .push(Change::new(path, beta.cloned(), alpha.cloned()));
    out.ancestor_changes
        .push(Change::new(path, ancestor.cloned(), alpha.cloned()));
}

// --- One-way replica ------------------------------------------------------

fn reconcile_one_way_replica(
    path: &str,
    ancestor: Option<&Entry>,
    alpha: Option<&Entry>,
    beta: Option<&Entry>,
    out: &mut Reconciliation,
) {
    if is_unsynchronizable(alpha) {
        // Can't force beta to adopt, or the ancestor to record, garbage.
        return;
    }
    out.beta_transitions
        .push(Change::new(path, beta.cloned(), alpha.cloned()));
    out.ancestor_changes
        .push(Change::new(path, ancestor.cloned(), alpha.cloned()));
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "reconcile_proptest.rs"]
mod proptest_tests;
