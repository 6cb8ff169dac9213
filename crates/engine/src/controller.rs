//! [`Controller`]: the per-session state machine that drives the
//! scan → reconcile → stage → transition → persist loop (spec §4.2).

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use duet_core::{
    Archive, Change, Clock, Conflict, Entry, EndpointState, Problem, Session, Snapshot, Status,
    Truncated, DEFAULT_CONFLICT_LIMIT, DEFAULT_SCAN_PROBLEM_LIMIT, DEFAULT_TRANSITION_PROBLEM_LIMIT,
};
use duet_endpoint::{transition_dependencies, Connector, Endpoint, EndpointError, ScanOutcome};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ControllerError;
use crate::reconcile::reconcile;
use crate::safety::{contains_root_deletion, contains_root_type_change, one_endpoint_emptied_root};
use crate::stage::{stage_one_side, ProgressSlot};
use crate::tracker::ChangeTracker;

/// How long to wait before retrying a failed connection (spec §4.2 step 1).
pub const AUTO_RECONNECT_INTERVAL: Duration = Duration::from_secs(15);
/// How long to wait before rescanning after a transient scan error (spec §4.2 step 3).
pub const RESCAN_WAIT_DURATION: Duration = Duration::from_secs(5);

/// The three ways a running controller can be stopped (spec §4.2 `halt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltMode {
    /// Persist `paused = true`; the session can be `resume()`d later.
    Pause,
    /// Disable the controller; lifecycle operations other than `halt` fail from now on.
    Shutdown,
    /// Disable the controller and delete its session and archive files.
    Terminate,
}

struct FlushRequest {
    reply: oneshot::Sender<()>,
}

/// State protected by the tracking lock (spec §5: "`session.paused`,
/// `state`, `synchronizing`: protected by the state tracking lock").
struct TrackingState {
    session: Session,
    status: Status,
    last_error: Option<String>,
    successful_cycles: u64,
    conflicts: Vec<Conflict>,
    alpha_state: EndpointState,
    beta_state: EndpointState,
}

/// State protected by the lifecycle lock (spec §5: "`disabled`, `cancel`,
/// `flushRequests`, `done`").
#[derive(Default)]
struct Lifecycle {
    disabled: bool,
    cancel: Option<CancellationToken>,
    flush_tx: Option<mpsc::Sender<FlushRequest>>,
    loop_handle: Option<JoinHandle<()>>,
}

struct Inner<Clk: Clock> {
    session_path: PathBuf,
    archive_path: PathBuf,
    connector: Arc<dyn Connector>,
    #[allow(dead_code)] // reserved for future backoff/telemetry timing use
    clock: Clk,
    tracking: RwLock<TrackingState>,
    tracker: Arc<ChangeTracker>,
    lifecycle: Mutex<Lifecycle>,
}

/// The per-session run loop and lifecycle operations (spec §4.2).
///
/// Cheap to clone — every clone shares the same underlying state via `Arc`,
/// which is what lets the spawned loop task and the handle returned to
/// callers (`resume`/`halt`/`flush`/`reset`/`current_state`) refer to the
/// same controller.
pub struct Controller<Clk: Clock = duet_core::SystemClock> {
    inner: Arc<Inner<Clk>>,
}

impl<Clk: Clock> Clone for Controller<Clk> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// A thin external handle exposing the same operations as [`Controller`]
/// without exposing the `Clk` type parameter to callers that don't care
/// about it (e.g. `duet-manager`'s registry, which is generic over many
/// controllers at once).
pub type ControllerHandle = Controller<duet_core::SystemClock>;

impl<Clk: Clock> Controller<Clk> {
    pub fn new(
        session: Session,
        session_path: PathBuf,
        archive_path: PathBuf,
        connector: Arc<dyn Connector>,
        clock: Clk,
    ) -> Self {
        let tracking = TrackingState {
            session,
            status: Status::Disconnected,
            last_error: None,
            successful_cycles: 0,
            conflicts: Vec::new(),
            alpha_state: EndpointState::disconnected(),
            beta_state: EndpointState::disconnected(),
        };
        Self {
            inner: Arc::new(Inner {
                session_path,
                archive_path,
                connector,
                clock,
                tracking: RwLock::new(tracking),
                tracker: Arc::new(ChangeTracker::new()),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    /// Cheap `Arc`-shared handle for `WaitForChange`/`Terminate` (spec §4.5),
    /// independent of whether the loop is currently running.
    pub fn tracker(&self) -> Arc<ChangeTracker> {
        Arc::clone(&self.inner.tracker)
    }

    /// An owned snapshot of the live state, built under the tracking lock
    /// for exactly as long as a clone takes (spec §9 "Dynamic state cloning").
    pub fn current_state(&self) -> duet_core::State {
        let t = self.inner.tracking.read();
        duet_core::State {
            session: t.session.clone(),
            status: t.status,
            last_error: t.last_error.clone(),
            successful_cycles: t.successful_cycles,
            conflicts: Truncated::from_full(t.conflicts.clone(), DEFAULT_CONFLICT_LIMIT),
            alpha_state: t.alpha_state.clone(),
            beta_state: t.beta_state.clone(),
        }
    }

    pub fn session_id(&self) -> duet_core::SessionId {
        self.inner.tracking.read().session.identifier.clone()
    }

    fn is_running(&self) -> bool {
        self.inner
            .lifecycle
            .lock()
            .loop_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    fn is_disabled(&self) -> bool {
        self.inner.lifecycle.lock().disabled
    }

    fn is_pre_watching(status: Status) -> bool {
        matches!(
            status,
            Status::Disconnected | Status::ConnectingAlpha | Status::ConnectingBeta
        )
    }

    /// Spec §4.2 `resume(ctx, prompter)`.
    pub async fn resume(&self) -> Result<(), ControllerError> {
        if self.is_disabled() {
            return Err(ControllerError::Disabled);
        }
        if self.is_running() {
            let status = self.inner.tracking.read().status;
            if !Self::is_pre_watching(status) {
                return Ok(());
            }
        }
        self.cancel_and_wait().await;
        self.inner.tracking.write().session.paused = false;
        self.persist_session()?;
        self.spawn_loop();
        Ok(())
    }

    /// Spec §4.2 `halt(ctx, mode, prompter)`.
    pub async fn halt(&self, mode: HaltMode) -> Result<(), ControllerError> {
        self.cancel_and_wait().await;
        match mode {
            HaltMode::Pause => {
                self.inner.tracking.write().session.paused = true;
                self.persist_session()?;
            }
            HaltMode::Shutdown => {
                self.inner.lifecycle.lock().disabled = true;
            }
            HaltMode::Terminate => {
                self.inner.lifecycle.lock().disabled = true;
                duet_storage::delete_session(&self.inner.session_path)?;
                duet_storage::delete_archive(&self.inner.archive_path)?;
                self.inner.tracker.terminate();
            }
        }
        Ok(())
    }

    /// Spec §4.2 `flush(ctx, prompter, skipWait)`.
    pub async fn flush(&self, skip_wait: bool) -> Result<(), ControllerError> {
        if self.is_disabled() {
            return Err(ControllerError::Disabled);
        }
        if self.inner.tracking.read().session.paused {
            return Err(ControllerError::Paused);
        }
        let tx = {
            let lifecycle = self.inner.lifecycle.lock();
            let status = self.inner.tracking.read().status;
            match &lifecycle.flush_tx {
                Some(tx) if !status.is_halted() => tx.clone(),
                _ => return Err(ControllerError::NotSynchronizing),
            }
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(FlushRequest { reply: reply_tx })
            .await
            .map_err(|_| ControllerError::NotSynchronizing)?;
        if skip_wait {
            return Ok(());
        }
        reply_rx.await.map_err(|_| ControllerError::Cancelled)
    }

    /// Spec §4.2 `reset(ctx, prompter)`.
    pub async fn reset(&self) -> Result<(), ControllerError> {
        if self.is_disabled() {
            return Err(ControllerError::Disabled);
        }
        let was_running = self.is_running();
        self.halt(HaltMode::Pause).await?;
        duet_storage::write_archive(&self.inner.archive_path, &Archive::empty())?;
        if was_running {
            self.resume().await?;
        }
        Ok(())
    }

    async fn cancel_and_wait(&self) {
        let (cancel, handle) = {
            let mut lifecycle = self.inner.lifecycle.lock();
            (lifecycle.cancel.take(), lifecycle.loop_handle.take())
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.inner.lifecycle.lock().flush_tx = None;
    }

    fn spawn_loop(&self) {
        let cancel = CancellationToken::new();
        let (flush_tx, flush_rx) = mpsc::channel(1);
        let controller = self.clone();
        let loop_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            controller.run_loop(loop_cancel, flush_rx).await;
        });
        let mut lifecycle = self.inner.lifecycle.lock();
        lifecycle.cancel = Some(cancel);
        lifecycle.flush_tx = Some(flush_tx);
        lifecycle.loop_handle = Some(handle);
    }

    fn persist_session(&self) -> Result<(), ControllerError> {
        let session = self.inner.tracking.read().session.clone();
        duet_storage::write_session(&self.inner.session_path, &session)?;
        Ok(())
    }

    fn set_status(&self, status: Status) {
        self.inner.tracking.write().status = status;
        self.inner.tracker.notify_change();
    }

    fn set_last_error(&self, message: impl Into<String>) {
        self.inner.tracking.write().last_error = Some(message.into());
        self.inner.tracker.notify_change();
    }

    fn clear_last_error(&self) {
        self.inner.tracking.write().last_error = None;
    }

    fn set_endpoint_connected(&self, side: Side, connected: bool) {
        let mut t = self.inner.tracking.write();
        match side {
            Side::Alpha => t.alpha_state.connected = connected,
            Side::Beta => t.beta_state.connected = connected,
        }
        drop(t);
        self.inner.tracker.notify_change();
    }

    async fn shutdown_endpoints(
        &self,
        alpha: Option<&dyn Endpoint>,
        beta: Option<&dyn Endpoint>,
    ) {
        if let Some(a) = alpha {
            a.shutdown().await;
        }
        if let Some(b) = beta {
            b.shutdown().await;
        }
        let mut t = self.inner.tracking.write();
        t.alpha_state.connected = false;
        t.beta_state.connected = false;
        drop(t);
        self.inner.tracker.notify_change();
    }

    /// Ensure both endpoints are connected, retrying with backoff. Returns
    /// `false` iff cancelled first (spec §4.2 step 1).
    async fn ensure_connected(
        &self,
        cancel: &CancellationToken,
        alpha_url: &str,
        beta_url: &str,
        alpha: &mut Option<Box<dyn Endpoint>>,
        beta: &mut Option<Box<dyn Endpoint>>,
    ) -> bool {
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            if alpha.is_none() {
                self.set_status(Status::ConnectingAlpha);
                match self.inner.connector.connect(alpha_url).await {
                    Ok(endpoint) => {
                        *alpha = Some(endpoint);
                        self.set_endpoint_connected(Side::Alpha, true);
                    }
                    Err(e) => self.set_last_error(e.to_string()),
                }
            }
            if beta.is_none() {
                self.set_status(Status::ConnectingBeta);
                match self.inner.connector.connect(beta_url).await {
                    Ok(endpoint) => {
                        *beta = Some(endpoint);
                        self.set_endpoint_connected(Side::Beta, true);
                    }
                    Err(e) => self.set_last_error(e.to_string()),
                }
            }
            if alpha.is_some() && beta.is_some() {
                return true;
            }
            if !sleep_cancellable(AUTO_RECONNECT_INTERVAL, cancel).await {
                return false;
            }
        }
    }

    async fn scan_both(
        &self,
        cancel: &CancellationToken,
        alpha: &dyn Endpoint,
        beta: &dyn Endpoint,
        ancestor: Option<&Entry>,
        full: bool,
    ) -> ScanStepOutcome {
        loop {
            if cancel.is_cancelled() {
                return ScanStepOutcome::Cancelled;
            }
            let (alpha_res, beta_res) = tokio::join!(alpha.scan(ancestor, full), beta.scan(ancestor, full));
            match (alpha_res, beta_res) {
                (ScanOutcome::Snapshot(a), ScanOutcome::Snapshot(b)) => {
                    return ScanStepOutcome::Snapshots(a, b)
                }
                (ScanOutcome::Failed(e), _) | (_, ScanOutcome::Failed(e)) => {
                    return ScanStepOutcome::Terminal(e.to_string())
                }
                (ScanOutcome::Retryable(e), _) | (_, ScanOutcome::Retryable(e)) => {
                    self.set_last_error(e.to_string());
                    self.set_status(Status::WaitingForRescan);
                    if !sleep_cancellable(RESCAN_WAIT_DURATION, cancel).await {
                        return ScanStepOutcome::Cancelled;
                    }
                    self.set_status(Status::Scanning);
                }
            }
        }
    }

    fn update_endpoint_stats(&self, alpha: &Snapshot, beta: &Snapshot) {
        let mut t = self.inner.tracking.write();
        t.alpha_state.scanned = true;
        t.alpha_state.directories = alpha.directories;
        t.alpha_state.files = alpha.files;
        t.alpha_state.symbolic_links = alpha.symbolic_links;
        t.alpha_state.total_file_size = alpha.total_file_size;
        t.alpha_state.scan_problems =
            Truncated::from_full(collect_scan_problems(alpha.content.as_ref()), DEFAULT_SCAN_PROBLEM_LIMIT);

        t.beta_state.scanned = true;
        t.beta_state.directories = beta.directories;
        t.beta_state.files = beta.files;
        t.beta_state.symbolic_links = beta.symbolic_links;
        t.beta_state.total_file_size = beta.total_file_size;
        t.beta_state.scan_problems =
            Truncated::from_full(collect_scan_problems(beta.content.as_ref()), DEFAULT_SCAN_PROBLEM_LIMIT);
        drop(t);
        self.inner.tracker.notify_change();
    }

    fn record_transition_problems(&self, alpha_problems: &[Problem], beta_problems: &[Problem]) {
        let mut t = self.inner.tracking.write();
        t.alpha_state.transition_problems =
            Truncated::from_full(alpha_problems.to_vec(), DEFAULT_TRANSITION_PROBLEM_LIMIT);
        t.beta_state.transition_problems =
            Truncated::from_full(beta_problems.to_vec(), DEFAULT_TRANSITION_PROBLEM_LIMIT);
        drop(t);
        self.inner.tracker.notify_change();
    }

    /// One terminal-for-the-cycle error: shut both endpoints, back off, and
    /// let the outer loop reconnect from scratch (spec §4.2 "All errors
    /// during steps 2-10 close the synchronizing gate, shut both
    /// endpoints...").
    async fn handle_cycle_error(
        &self,
        message: String,
        alpha: &mut Option<Box<dyn Endpoint>>,
        beta: &mut Option<Box<dyn Endpoint>>,
        cancel: &CancellationToken,
    ) {
        self.set_last_error(message);
        self.shutdown_endpoints(alpha.as_deref(), beta.as_deref()).await;
        *alpha = None;
        *beta = None;
        self.set_status(Status::Disconnected);
        sleep_cancellable(AUTO_RECONNECT_INTERVAL, cancel).await;
    }

    /// The per-cycle run loop (spec §4.2). Runs until `cancel` fires or a
    /// safety gate halts the session permanently.
    async fn run_loop(self, cancel: CancellationToken, mut flush_rx: mpsc::Receiver<FlushRequest>) {
        let mut alpha: Option<Box<dyn Endpoint>> = None;
        let mut beta: Option<Box<dyn Endpoint>> = None;

        let mut ancestor = match duet_storage::read_archive(&self.inner.archive_path) {
            Ok(archive) => archive.content,
            Err(e) => {
                self.set_last_error(e.to_string());
                return;
            }
        };

        let (alpha_url, beta_url, mode) = {
            let t = self.inner.tracking.read();
            (
                t.session.alpha_url.clone(),
                t.session.beta_url.clone(),
                t.session.effective_mode(),
            )
        };

        let alpha_progress = ProgressSlot::new();
        let beta_progress = ProgressSlot::new();
        let mut pending_flush: Option<FlushRequest> = None;
        let mut skip_polling = false;

        loop {
            if cancel.is_cancelled() {
                self.shutdown_endpoints(alpha.as_deref(), beta.as_deref()).await;
                return;
            }

            if alpha.is_none() || beta.is_none() {
                if !self
                    .ensure_connected(&cancel, &alpha_url, &beta_url, &mut alpha, &mut beta)
                    .await
                {
                    self.shutdown_endpoints(alpha.as_deref(), beta.as_deref()).await;
                    return;
                }
            }

            if !skip_polling {
                self.set_status(Status::Watching);
                let mut errored = false;
                enum PollOutcome {
                    AlphaErr(EndpointError),
                    BetaErr(EndpointError),
                    Flush(FlushRequest),
                    AlphaOk,
                    BetaOk,
                }
                let outcome = {
                    let (Some(alpha_ref), Some(beta_ref)) = (alpha.as_deref(), beta.as_deref()) else {
                        continue;
                    };
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            self.shutdown_endpoints(alpha.as_deref(), beta.as_deref()).await;
                            return;
                        }
                        res = alpha_ref.poll(&cancel) => {
                            match res {
                                Err(e) => PollOutcome::AlphaErr(e),
                                Ok(()) => PollOutcome::AlphaOk,
                            }
                        }
                        res = beta_ref.poll(&cancel) => {
                            match res {
                                Err(e) => PollOutcome::BetaErr(e),
                                Ok(()) => PollOutcome::BetaOk,
                            }
                        }
                        Some(req) = flush_rx.recv() => {
                            PollOutcome::Flush(req)
                        }
                    }
                };
                match outcome {
                    PollOutcome::AlphaErr(e) | PollOutcome::BetaErr(e) => {
                        self.handle_cycle_error(e.to_string(), &mut alpha, &mut beta, &cancel).await;
                        errored = true;
                    }
                    PollOutcome::Flush(req) => pending_flush = Some(req),
                    PollOutcome::AlphaOk | PollOutcome::BetaOk => {}
                }
                if errored {
                    continue;
                }
            }
            skip_polling = false;

            let full = pending_flush.is_some();

            self.set_status(Status::Scanning);
            let scan_outcome = {
                let (Some(alpha_ref), Some(beta_ref)) = (alpha.as_deref(), beta.as_deref()) else {
                    continue;
                };
                self.scan_both(&cancel, alpha_ref, beta_ref, ancestor.as_ref(), full).await
            };
            let (alpha_snapshot, beta_snapshot) = match scan_outcome {
                ScanStepOutcome::Snapshots(a, b) => (a, b),
                ScanStepOutcome::Terminal(message) => {
                    self.handle_cycle_error(message, &mut alpha, &mut beta, &cancel).await;
                    continue;
                }
                ScanStepOutcome::Cancelled => {
                    self.shutdown_endpoints(alpha.as_deref(), beta.as_deref()).await;
                    return;
                }
            };

            self.update_endpoint_stats(&alpha_snapshot, &beta_snapshot);
            self.clear_last_error();

            let (alpha_content, beta_content) = propagate_executability(&alpha_snapshot, &beta_snapshot);

            if one_endpoint_emptied_root(ancestor.as_ref(), alpha_content.as_ref(), beta_content.as_ref()) {
                self.set_status(Status::HaltedOnRootEmptied);
                cancel.cancelled().await;
                self.shutdown_endpoints(alpha.as_deref(), beta.as_deref()).await;
                return;
            }

            self.set_status(Status::Reconciling);
            let reconciliation = reconcile(ancestor.as_ref(), alpha_content.as_ref(), beta_content.as_ref(), mode);

            if contains_root_deletion(&reconciliation.alpha_transitions)
                || contains_root_deletion(&reconciliation.beta_transitions)
            {
                self.set_status(Status::HaltedOnRootDeletion);
                cancel.cancelled().await;
                self.shutdown_endpoints(alpha.as_deref(), beta.as_deref()).await;
                return;
            }
            if contains_root_type_change(&reconciliation.alpha_transitions)
                || contains_root_type_change(&reconciliation.beta_transitions)
            {
                self.set_status(Status::HaltedOnRootTypeChange);
                cancel.cancelled().await;
                self.shutdown_endpoints(alpha.as_deref(), beta.as_deref()).await;
                return;
            }

            {
                let mut t = self.inner.tracking.write();
                t.conflicts = reconciliation.conflicts.clone();
            }
            self.inner.tracker.notify_change();

            self.set_status(Status::StagingAlpha);
            let alpha_deps = transition_dependencies(&reconciliation.alpha_transitions);
            let alpha_stage_result = {
                let (Some(alpha_ref), Some(beta_ref)) = (alpha.as_deref(), beta.as_deref()) else {
                    continue;
                };
                stage_one_side(alpha_ref, beta_ref, &alpha_deps, Arc::clone(&alpha_progress), &cancel).await
            };
            if let Err(e) = alpha_stage_result {
                self.handle_cycle_error(e.to_string(), &mut alpha, &mut beta, &cancel).await;
                continue;
            }

            self.set_status(Status::StagingBeta);
            let beta_deps = transition_dependencies(&reconciliation.beta_transitions);
            let beta_stage_result = {
                let (Some(alpha_ref), Some(beta_ref)) = (alpha.as_deref(), beta.as_deref()) else {
                    continue;
                };
                stage_one_side(beta_ref, alpha_ref, &beta_deps, Arc::clone(&beta_progress), &cancel).await
            };
            if let Err(e) = beta_stage_result {
                self.handle_cycle_error(e.to_string(), &mut alpha, &mut beta, &cancel).await;
                continue;
            }

            self.set_status(Status::Transitioning);
            let (alpha_transition_result, beta_transition_result) = {
                let (Some(alpha_ref), Some(beta_ref)) = (alpha.as_deref(), beta.as_deref()) else {
                    continue;
                };
                tokio::join!(
                    alpha_ref.transition(&cancel, &reconciliation.alpha_transitions),
                    beta_ref.transition(&cancel, &reconciliation.beta_transitions),
                )
            };
            let alpha_outcome = match alpha_transition_result {
                Ok(o) => o,
                Err(e) => {
                    self.handle_cycle_error(e.to_string(), &mut alpha, &mut beta, &cancel).await;
                    continue;
                }
            };
            let beta_outcome = match beta_transition_result {
                Ok(o) => o,
                Err(e) => {
                    self.handle_cycle_error(e.to_string(), &mut alpha, &mut beta, &cancel).await;
                    continue;
                }
            };

            self.record_transition_problems(&alpha_outcome.problems, &beta_outcome.problems);

            // Spec §4.2 step 10: fold into the ancestor only the changes
            // whose transition actually succeeded — a problem at one path
            // never blocks ancestor advancement at an unrelated path (spec
            // §9 open question, resolved literally as the source does it).
            let failed_paths: HashSet<&str> = alpha_outcome
                .problems
                .iter()
                .chain(beta_outcome.problems.iter())
                .map(|p| p.path.as_str())
                .collect();
            let accepted_changes: Vec<Change> = reconciliation
                .ancestor_changes
                .iter()
                .filter(|c| !failed_paths.contains(c.path.as_str()))
                .cloned()
                .collect();

            self.set_status(Status::Saving);
            let current_archive = match Archive::new(ancestor.clone()) {
                Ok(archive) => archive,
                Err(e) => {
                    self.handle_cycle_error(format!("ancestor corrupted: {e}"), &mut alpha, &mut beta, &cancel)
                        .await;
                    continue;
                }
            };
            match current_archive.apply(&accepted_changes) {
                Ok(new_archive) => {
                    if let Err(e) = duet_storage::write_archive(&self.inner.archive_path, &new_archive) {
                        self.handle_cycle_error(e.to_string(), &mut alpha, &mut beta, &cancel).await;
                        continue;
                    }
                    ancestor = new_archive.content;
                }
                Err(e) => {
                    self.handle_cycle_error(
                        format!("post-reconcile ancestor failed validation: {e}"),
                        &mut alpha,
                        &mut beta,
                        &cancel,
                    )
                    .await;
                    continue;
                }
            }

            {
                let mut t = self.inner.tracking.write();
                t.successful_cycles += 1;
            }
            self.inner.tracker.notify_change();

            if let Some(req) = pending_flush.take() {
                let _ = req.reply.send(());
            }

            // Spec §4.2 step 11: a missing-files transition result triggers
            // one immediate rescan cycle, skipping the poll wait.
            skip_polling = alpha_outcome.missing_files || beta_outcome.missing_files;
        }
    }
}

#[derive(Clone, Copy)]
enum Side {
    Alpha,
    Beta,
}

enum ScanStepOutcome {
    Snapshots(Snapshot, Snapshot),
    Terminal(String),
    Cancelled,
}

/// Sleep for `duration`, returning `false` early if `cancel` fires first
/// (spec §4.2: every blocking wait observes cancellation promptly).
async fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Spec §4.1 point 5 / §4.2 step 5: when exactly one side preserves
/// executability, propagate it from the preserving side onto the other
/// before reconciliation ever sees the trees.
fn propagate_executability(alpha: &Snapshot, beta: &Snapshot) -> (Option<Entry>, Option<Entry>) {
    match (alpha.preserves_executability, beta.preserves_executability) {
        (true, false) => {
            let beta_content = beta.content.as_ref().map(|b| match &alpha.content {
                Some(a) => b.propagate_executability_from(a),
                None => b.clone(),
            });
            (alpha.content.clone(), beta_content)
        }
        (false, true) => {
            let alpha_content = alpha.content.as_ref().map(|a| match &beta.content {
                Some(b) => a.propagate_executability_from(b),
                None => a.clone(),
            });
            (alpha_content, beta.content.clone())
        }
        _ => (alpha.content.clone(), beta.content.clone()),
    }
}

fn collect_scan_problems(entry: Option<&Entry>) -> Vec<Problem> {
    fn walk(path: &str, entry: &Entry, out: &mut Vec<Problem>) {
        match entry {
            Entry::Problematic { problem } => out.push(Problem::new(path, problem.clone())),
            Entry::Directory { contents } => {
                for (name, child) in contents {
                    let child_path = if path.is_empty() {
                        name.clone()
                    } else {
                        format!("{path}/{name}")
                    };
                    walk(&child_path, child, out);
                }
            }
            _ => {}
        }
    }
    let mut out = Vec::new();
    if let Some(entry) = entry {
        walk("", entry, &mut out);
    }
    out
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
