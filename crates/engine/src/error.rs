//! Engine-level errors: reconciliation, staging, and controller lifecycle.

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("unrecognized synchronization mode (programmer error)")]
    UnrecognizedMode,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("controller disabled")]
    Disabled,
    #[error("session is paused")]
    Paused,
    #[error("controller is not currently synchronizing")]
    NotSynchronizing,
    #[error("endpoint error: {0}")]
    Endpoint(#[from] duet_endpoint::EndpointError),
    #[error("storage error: {0}")]
    Storage(#[from] duet_storage::StorageError),
    #[error("archive error: {0}")]
    Archive(#[from] duet_core::ArchiveError),
    #[error("post-reconcile ancestor failed validation (reconciler bug): {0}")]
    InvalidAncestor(duet_core::ArchiveError),
    #[error("operation cancelled")]
    Cancelled,
}
