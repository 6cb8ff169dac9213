//! Manager-level errors: label-selector parsing and selection failures.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty label requirement")]
    EmptyRequirement,
    #[error("empty key in label requirement {0:?}")]
    EmptyKey(String),
    #[error("unterminated '(' in label requirement {0:?}")]
    UnterminatedParen(String),
    #[error("empty value set in label requirement {0:?}")]
    EmptyValueSet(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// An explicit name/identifier or a label expression matched no session
    /// (spec §6 "each explicit selector must match at least one session").
    #[error("selector {0:?} matched no sessions")]
    NoMatch(String),
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error(transparent)]
    Storage(#[from] duet_storage::StorageError),
    #[error(transparent)]
    Controller(#[from] duet_engine::ControllerError),
}
