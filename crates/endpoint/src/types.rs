//! Shapes exchanged across the [`crate::Endpoint`] boundary (spec §4.4).

use duet_core::{Change, Digest, Entry, Snapshot};

use crate::error::EndpointError;

/// Outcome of [`crate::Endpoint::scan`]: a snapshot, a transient failure the
/// caller should retry after a short delay, or a terminal failure.
#[derive(Debug)]
pub enum ScanOutcome {
    Snapshot(Snapshot),
    Retryable(EndpointError),
    Failed(EndpointError),
}

impl ScanOutcome {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScanOutcome::Retryable(_))
    }
}

/// The base state the requesting endpoint already holds for a path, used by
/// a real rsync codec to compute a delta. The codec itself is out of scope
/// here (see crate docs); [`crate::local::LocalEndpoint`] ignores the
/// signature body and transfers whole entries.
pub type Signature = Option<Digest>;

/// Outcome of [`crate::Endpoint::stage`]: an order-preserving subset of the
/// requested paths this endpoint still needs, their base signatures, and a
/// receiver to feed rsync operations into — `None` iff the subset is empty.
pub struct StageOutcome {
    pub paths: Vec<String>,
    pub signatures: Vec<Signature>,
    pub receiver: Option<Box<dyn crate::receiver::Receiver>>,
}

impl StageOutcome {
    pub fn empty() -> Self {
        Self {
            paths: Vec::new(),
            signatures: Vec::new(),
            receiver: None,
        }
    }
}

/// A whole-file payload transferred in place of a real rsync delta (spec
/// §9: "Endpoint polymorphism" — the delta codec is an out-of-scope
/// collaborator, so the in-repo receiver transfers complete content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: String,
    pub digest: Digest,
    pub content: Vec<u8>,
    pub executable: bool,
}

/// A non-fatal, per-path diagnostic surfaced by [`crate::Endpoint::transition`].
pub use duet_core::Problem;

/// Outcome of [`crate::Endpoint::transition`]: the resulting entry for each
/// transition (in input order, `None` when the path was deleted), non-fatal
/// per-path problems, and whether any path was missing required staged
/// content (signals concurrent mutation during staging; triggers one
/// immediate retry cycle per spec §7).
pub struct TransitionOutcome {
    pub results: Vec<Option<Entry>>,
    pub problems: Vec<Problem>,
    pub missing_files: bool,
}

impl TransitionOutcome {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            problems: Vec::new(),
            missing_files: false,
        }
    }
}

/// The digests (and paths) a `Stage` call must ensure are available before
/// the matching `Transition` can apply (spec §4.2 step 8).
#[derive(Debug, Clone)]
pub struct TransitionDependency {
    pub path: String,
    pub digest: Digest,
}

/// Compute the file digests that `transitions` will need staged on the
/// receiving side before they can be applied.
pub fn transition_dependencies(transitions: &[Change]) -> Vec<TransitionDependency> {
    let mut out = Vec::new();
    collect(transitions, &mut out);
    out
}

fn collect(transitions: &[Change], out: &mut Vec<TransitionDependency>) {
    for change in transitions {
        visit(&change.path, change.new.as_ref(), out);
    }
}

fn visit(path: &str, entry: Option<&Entry>, out: &mut Vec<TransitionDependency>) {
    match entry {
        Some(Entry::File { digest, .. }) => out.push(TransitionDependency {
            path: path.to_string(),
            digest: *digest,
        }),
        Some(Entry::Directory { contents }) => {
            for (name, child) in contents {
                let child_path = if path.is_empty() {
                    name.clone()
                } else {
                    format!("{path}/{name}")
                };
                visit(&child_path, Some(child), out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::entry::test_support::*;

    #[test]
    fn transition_dependencies_collects_files_recursively() {
        let changes = vec![Change::creation(
            "",
            dir(&[("a", file("1")), ("b", dir(&[("c", file("2"))]))]),
        )];
        let deps = transition_dependencies(&changes);
        let paths: Vec<_> = deps.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b/c"]);
    }

    #[test]
    fn transition_dependencies_ignores_deletions() {
        let changes = vec![Change::deletion("a", file("1"))];
        assert!(transition_dependencies(&changes).is_empty());
    }
}
