//! Errors from [`crate::Endpoint`] and [`crate::Receiver`] operations.
//!
//! Spec contract: "After any non-Shutdown method returns an error, only
//! Shutdown may be called." Callers enforce that; this type only carries
//! the failure.

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("endpoint is not connected")]
    NotConnected,
    #[error("operation cancelled")]
    Cancelled,
    #[error("path not found in staged content: {path}")]
    UnknownPath { path: String },
    #[error("transition of {path} does not apply: expected old entry did not match endpoint content")]
    TransitionDoesNotApply { path: String },
    #[error("endpoint content is not synchronizable: {0}")]
    NotSynchronizable(#[from] duet_core::EntryError),
    #[error("{0}")]
    Other(String),
}
