//! The rsync hand-off coordinator (spec §4.3): decorators composed around
//! an [`duet_endpoint::Receiver`] by the controller's staging step, plus
//! the top-level `stage_one_side` entry point that drives one direction
//! of a Stage→Supply hand-off.

use std::sync::Arc;

use async_trait::async_trait;
use duet_core::state::StagingProgress;
use duet_endpoint::{Endpoint, EndpointError, Receiver, StagedFile};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// Shared sink for per-path progress updates, written by
/// [`MonitoringReceiver`] and read by the controller to populate
/// `EndpointState::staging_progress`.
#[derive(Debug, Default)]
pub struct ProgressSlot(RwLock<Option<StagingProgress>>);

impl ProgressSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self) -> Option<StagingProgress> {
        self.0.read().clone()
    }

    fn set(&self, progress: StagingProgress) {
        *self.0.write() = Some(progress);
    }

    fn clear(&self) {
        *self.0.write() = None;
    }
}

/// Wraps a receiver to publish per-path progress into a [`ProgressSlot`]
/// under the state tracking lock (spec §4.3: "updates `stagingProgress` on
/// the appropriate endpoint state").
pub struct MonitoringReceiver {
    inner: Box<dyn Receiver>,
    progress: Arc<ProgressSlot>,
    files_total: u64,
    files_staged: u64,
}

impl MonitoringReceiver {
    pub fn new(inner: Box<dyn Receiver>, progress: Arc<ProgressSlot>, files_total: u64) -> Self {
        Self {
            inner,
            progress,
            files_total,
            files_staged: 0,
        }
    }
}

#[async_trait]
impl Receiver for MonitoringReceiver {
    async fn receive(&mut self, file: StagedFile) -> Result<(), EndpointError> {
        let expected_size = file.content.len() as u64;
        self.progress.set(StagingProgress {
            path: file.path.clone(),
            received_size: expected_size,
            expected_size,
            files_staged: self.files_staged,
            files_total: self.files_total,
        });
        self.inner.receive(file).await?;
        self.files_staged += 1;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<(), EndpointError> {
        let result = self.inner.finalize().await;
        self.progress.clear();
        result
    }
}

/// Wraps a receiver so every operation observes the controller's
/// cancellation token; a cancellation that fires mid-transfer terminates
/// the receive with [`EndpointError::Cancelled`] (spec §4.3, §5
/// "In-flight rsync receives are terminated by the PreemptableReceiver").
pub struct PreemptableReceiver {
    inner: Box<dyn Receiver>,
    cancel: CancellationToken,
}

impl PreemptableReceiver {
    pub fn new(inner: Box<dyn Receiver>, cancel: CancellationToken) -> Self {
        Self { inner, cancel }
    }
}

#[async_trait]
impl Receiver for PreemptableReceiver {
    async fn receive(&mut self, file: StagedFile) -> Result<(), EndpointError> {
        if self.cancel.is_cancelled() {
            return Err(EndpointError::Cancelled);
        }
        self.inner.receive(file).await
    }

    async fn finalize(&mut self) -> Result<(), EndpointError> {
        if self.cancel.is_cancelled() {
            return Err(EndpointError::Cancelled);
        }
        self.inner.finalize().await
    }
}

/// Stage `receiving` from `supplying` for the given transition
/// dependencies (spec §4.2 step 8): compute what `receiving` still needs,
/// wrap its receiver in monitoring + preemption, and ask `supplying` to
/// feed it.
///
/// A `None` progress slot update happens implicitly through `progress`;
/// callers pass the slot that corresponds to `receiving`'s endpoint state
/// (e.g. alpha's slot when staging alpha from beta).
pub async fn stage_one_side(
    receiving: &dyn Endpoint,
    supplying: &dyn Endpoint,
    deps: &[duet_endpoint::TransitionDependency],
    progress: Arc<ProgressSlot>,
    cancel: &CancellationToken,
) -> Result<(), EndpointError> {
    if deps.is_empty() {
        return Ok(());
    }
    let paths: Vec<String> = deps.iter().map(|d| d.path.clone()).collect();
    let digests: Vec<duet_core::Digest> = deps.iter().map(|d| d.digest).collect();

    let outcome = receiving.stage(&paths, &digests).await?;
    let Some(receiver) = outcome.receiver else {
        return Ok(());
    };

    let files_total = outcome.paths.len() as u64;
    let monitored = MonitoringReceiver::new(receiver, progress, files_total);
    let preemptable = PreemptableReceiver::new(Box::new(monitored), cancel.clone());

    supplying
        .supply(&outcome.paths, &outcome.signatures, Box::new(preemptable))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::entry::test_support::*;
    use duet_core::Change;
    use duet_endpoint::local::LocalEndpoint;
    use duet_endpoint::transition_dependencies;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn stage_one_side_is_a_no_op_for_empty_dependencies() {
        let receiving = LocalEndpoint::empty(true);
        let supplying = LocalEndpoint::empty(true);
        let result = stage_one_side(&receiving, &supplying, &[], ProgressSlot::new(), &token()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn stage_one_side_transfers_file_content() {
        let supplying = LocalEndpoint::new(Some(dir(&[("a", file("1"))])), true);
        supplying.put_blob(digest_for("1"), b"hello".to_vec());
        let receiving = LocalEndpoint::empty(true);

        let changes = vec![Change::creation("", dir(&[("a", file("1"))]))];
        let deps = transition_dependencies(&changes);

        stage_one_side(&receiving, &supplying, &deps, ProgressSlot::new(), &token())
            .await
            .unwrap();

        let outcome = receiving
            .transition(&token(), &changes)
            .await
            .unwrap();
        assert!(!outcome.missing_files);
    }

    #[tokio::test]
    async fn stage_one_side_fails_fast_when_already_cancelled() {
        let supplying = LocalEndpoint::new(Some(dir(&[("a", file("1"))])), true);
        supplying.put_blob(digest_for("1"), b"hello".to_vec());
        let receiving = LocalEndpoint::empty(true);

        let changes = vec![Change::creation("", dir(&[("a", file("1"))]))];
        let deps = transition_dependencies(&changes);

        let cancel = token();
        cancel.cancel();
        let result = stage_one_side(&receiving, &supplying, &deps, ProgressSlot::new(), &cancel).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn progress_slot_clears_after_finalize() {
        let supplying = LocalEndpoint::new(Some(dir(&[("a", file("1"))])), true);
        supplying.put_blob(digest_for("1"), b"hello".to_vec());
        let receiving = LocalEndpoint::empty(true);

        let changes = vec![Change::creation("", dir(&[("a", file("1"))]))];
        let deps = transition_dependencies(&changes);
        let progress = ProgressSlot::new();

        stage_one_side(&receiving, &supplying, &deps, Arc::clone(&progress), &token())
            .await
            .unwrap();

        assert!(progress.get().is_none());
    }
}
