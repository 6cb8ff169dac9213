//! [`SynchronizationMode`]: the wire/CLI-visible reconciliation policy.

use serde::{Deserialize, Serialize};

/// Which direction(s) changes propagate, and who wins disagreements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynchronizationMode {
    /// Disagreements not covered by the deletion/modification bias become
    /// conflicts; no transition on either side.
    TwoWaySafe,
    /// Alpha wins any disagreement.
    TwoWayResolved,
    /// Propagate alpha → beta only; beta's pure creations and deletions
    /// (where alpha is unchanged) are left alone.
    OneWaySafe,
    /// Beta is forced to match alpha unconditionally.
    OneWayReplica,
}

crate::simple_display! {
    SynchronizationMode {
        TwoWaySafe => "two-way-safe",
        TwoWayResolved => "two-way-resolved",
        OneWaySafe => "one-way-safe",
        OneWayReplica => "one-way-replica",
    }
}

impl SynchronizationMode {
    /// Whether transitions ever flow from beta back to alpha under this mode.
    pub fn is_two_way(self) -> bool {
        matches!(
            self,
            SynchronizationMode::TwoWaySafe | SynchronizationMode::TwoWayResolved
        )
    }

    /// Whether disagreements are resolved automatically (no conflicts emitted).
    pub fn is_resolved(self) -> bool {
        matches!(
            self,
            SynchronizationMode::TwoWayResolved | SynchronizationMode::OneWayReplica
        )
    }
}
