//! [`Receiver`]: the receiving half of an rsync-style hand-off (spec §4.3).
//!
//! The real block-delta codec is an out-of-scope collaborator (spec §1);
//! this trait is the seam the stager coordinator in `duet-engine` composes
//! decorators around (`MonitoringReceiver`, `PreemptableReceiver`), and the
//! seam [`crate::local::LocalEndpoint`] implements directly against whole
//! file content.

use async_trait::async_trait;

use crate::error::EndpointError;
use crate::types::StagedFile;

#[async_trait]
pub trait Receiver: Send {
    /// Accept one staged file. Implementations index applied content by
    /// digest so a later `Transition` can find it even if the path that
    /// requested it changed again concurrently.
    async fn receive(&mut self, file: StagedFile) -> Result<(), EndpointError>;

    /// Called once after the last `receive`, before the supplying side
    /// considers the hand-off complete.
    async fn finalize(&mut self) -> Result<(), EndpointError>;
}
