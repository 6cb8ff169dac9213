//! [`Endpoint`]: the sole abstraction seam between the controller and a
//! concrete transport (SSH, container exec, local filesystem) — spec §4.4,
//! §9 "Endpoint polymorphism".

use async_trait::async_trait;
use duet_core::{Change, Digest};
use tokio_util::sync::CancellationToken;

use crate::error::EndpointError;
use crate::receiver::Receiver;
use crate::types::{ScanOutcome, Signature, StageOutcome, TransitionOutcome};

/// External collaborator contract consumed by the controller run loop.
///
/// After any method other than [`Endpoint::shutdown`] returns an error, the
/// controller may only call `shutdown` on this handle; every other method
/// is presumed to be in an undefined state.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Returns when a filesystem event is observed or `cancel` fires.
    /// No-watch endpoints may return only on error or cancellation.
    async fn poll(&self, cancel: &CancellationToken) -> Result<(), EndpointError>;

    /// Produce a [`duet_core::Snapshot`]. `full` bypasses accelerated
    /// (ancestor-assisted) scanning.
    async fn scan(&self, ancestor: Option<&duet_core::Entry>, full: bool) -> ScanOutcome;

    /// `paths.len() == digests.len()`. Returns the order-preserving subset
    /// of `paths` this endpoint still needs, their base signatures, and a
    /// receiver — `Some` iff the subset is non-empty.
    async fn stage(
        &self,
        paths: &[String],
        digests: &[Digest],
    ) -> Result<StageOutcome, EndpointError>;

    /// Stream rsync operations for each of `paths` into `receiver`,
    /// finalizing it before returning.
    async fn supply(
        &self,
        paths: &[String],
        signatures: &[Signature],
        receiver: Box<dyn Receiver>,
    ) -> Result<(), EndpointError>;

    /// Apply each change atomically per path.
    async fn transition(
        &self,
        cancel: &CancellationToken,
        transitions: &[Change],
    ) -> Result<TransitionOutcome, EndpointError>;

    /// Idempotent. Preempts any in-flight call on remote endpoints by
    /// closing the transport.
    async fn shutdown(&self);
}
