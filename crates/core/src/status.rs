//! [`Status`]: the controller's wire/CLI-visible run-loop state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Disconnected,
    HaltedOnRootEmptied,
    HaltedOnRootDeletion,
    HaltedOnRootTypeChange,
    ConnectingAlpha,
    ConnectingBeta,
    Watching,
    Scanning,
    WaitingForRescan,
    Reconciling,
    StagingAlpha,
    StagingBeta,
    Transitioning,
    Saving,
}

crate::simple_display! {
    Status {
        Disconnected => "disconnected",
        HaltedOnRootEmptied => "halted-on-root-emptied",
        HaltedOnRootDeletion => "halted-on-root-deletion",
        HaltedOnRootTypeChange => "halted-on-root-type-change",
        ConnectingAlpha => "connecting-alpha",
        ConnectingBeta => "connecting-beta",
        Watching => "watching",
        Scanning => "scanning",
        WaitingForRescan => "waiting-for-rescan",
        Reconciling => "reconciling",
        StagingAlpha => "staging-alpha",
        StagingBeta => "staging-beta",
        Transitioning => "transitioning",
        Saving => "saving",
    }
}

impl Status {
    pub fn is_halted(self) -> bool {
        matches!(
            self,
            Status::HaltedOnRootEmptied
                | Status::HaltedOnRootDeletion
                | Status::HaltedOnRootTypeChange
        )
    }

    pub fn is_synchronizing(self) -> bool {
        matches!(
            self,
            Status::Scanning
                | Status::WaitingForRescan
                | Status::Reconciling
                | Status::StagingAlpha
                | Status::StagingBeta
                | Status::Transitioning
                | Status::Saving
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_is_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Status::HaltedOnRootEmptied).unwrap(),
            r#""halted-on-root-emptied""#
        );
        assert_eq!(
            serde_json::to_string(&Status::WaitingForRescan).unwrap(),
            r#""waiting-for-rescan""#
        );
    }

    #[test]
    fn halted_classification() {
        assert!(Status::HaltedOnRootEmptied.is_halted());
        assert!(Status::HaltedOnRootDeletion.is_halted());
        assert!(Status::HaltedOnRootTypeChange.is_halted());
        assert!(!Status::Watching.is_halted());
        assert!(!Status::Disconnected.is_halted());
    }

    #[test]
    fn synchronizing_classification_excludes_watching_and_disconnected() {
        assert!(!Status::Watching.is_synchronizing());
        assert!(!Status::Disconnected.is_synchronizing());
        assert!(Status::Scanning.is_synchronizing());
        assert!(Status::Saving.is_synchronizing());
    }
}
