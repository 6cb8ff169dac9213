//! [`LocalEndpoint`]: a fully in-process [`Endpoint`] backed by a
//! `parking_lot::Mutex<Option<Entry>>`, used by controller/manager
//! integration tests and the reconciler's scenario tests.
//!
//! It performs no real rsync delta computation: `stage`/`supply`/
//! `transition` operate directly on whole [`Entry`] subtrees keyed by
//! digest, sufficient to exercise every contract in the Endpoint interface
//! (filtered-subset ordering, missing-file signaling, atomicity-per-path)
//! without the real rsync codec, which is out of scope (spec §1).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use duet_core::{Archive, Change, Digest, Entry, Problem, Snapshot};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::endpoint_trait::Endpoint;
use crate::error::EndpointError;
use crate::receiver::Receiver;
use crate::types::{transition_dependencies, ScanOutcome, StageOutcome, StagedFile, TransitionOutcome};

struct State {
    archive: Archive,
    blobs: HashMap<Digest, Vec<u8>>,
    preserves_executability: bool,
    shutdown: bool,
}

/// An in-process stand-in for a real transport-backed endpoint.
#[derive(Clone)]
pub struct LocalEndpoint {
    state: Arc<Mutex<State>>,
}

impl LocalEndpoint {
    pub fn new(content: Option<Entry>, preserves_executability: bool) -> Self {
        let archive = Archive::new(content).unwrap_or_else(|_| Archive::empty());
        Self {
            state: Arc::new(Mutex::new(State {
                archive,
                blobs: HashMap::new(),
                preserves_executability,
                shutdown: false,
            })),
        }
    }

    pub fn empty(preserves_executability: bool) -> Self {
        Self::new(None, preserves_executability)
    }

    /// Register file content so `scan`/`stage`/`supply` can find its bytes
    /// by digest. Tests set this up alongside the `Entry` tree passed to
    /// [`LocalEndpoint::new`].
    pub fn put_blob(&self, digest: Digest, data: Vec<u8>) {
        self.state.lock().blobs.insert(digest, data);
    }

    /// Current content, for test assertions.
    pub fn content(&self) -> Option<Entry> {
        self.state.lock().archive.content.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shutdown
    }
}

fn entry_at<'a>(root: &'a Option<Entry>, path: &str) -> Option<&'a Entry> {
    if path.is_empty() {
        return root.as_ref();
    }
    let mut current = root.as_ref()?;
    for segment in path.split('/') {
        match current {
            Entry::Directory { contents } => {
                current = contents.get(segment)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

fn walk_stats(entry: &Entry, blobs: &HashMap<Digest, Vec<u8>>, snapshot: &mut Snapshot) {
    match entry {
        Entry::Directory { contents } => {
            snapshot.directories += 1;
            for child in contents.values() {
                walk_stats(child, blobs, snapshot);
            }
        }
        Entry::File { digest, .. } => {
            snapshot.files += 1;
            snapshot.total_file_size += blobs.get(digest).map(|b| b.len() as u64).unwrap_or(0);
        }
        Entry::SymbolicLink { .. } => snapshot.symbolic_links += 1,
        Entry::Untracked | Entry::Problematic { .. } => {}
    }
}

#[async_trait]
impl Endpoint for LocalEndpoint {
    async fn poll(&self, cancel: &CancellationToken) -> Result<(), EndpointError> {
        cancel.cancelled().await;
        Err(EndpointError::Cancelled)
    }

    async fn scan(&self, _ancestor: Option<&Entry>, _full: bool) -> ScanOutcome {
        let state = self.state.lock();
        if state.shutdown {
            return ScanOutcome::Failed(EndpointError::NotConnected);
        }
        let mut snapshot = Snapshot::empty(state.preserves_executability);
        if let Some(entry) = &state.archive.content {
            walk_stats(entry, &state.blobs, &mut snapshot);
        }
        snapshot.content = state.archive.content.clone();
        ScanOutcome::Snapshot(snapshot)
    }

    async fn stage(
        &self,
        paths: &[String],
        digests: &[Digest],
    ) -> Result<StageOutcome, EndpointError> {
        let state = self.state.lock();
        if state.shutdown {
            return Err(EndpointError::NotConnected);
        }
        let mut out = StageOutcome::empty();
        for (path, digest) in paths.iter().zip(digests.iter()) {
            if state.blobs.contains_key(digest) {
                continue;
            }
            out.paths.push(path.clone());
            out.signatures.push(None);
        }
        if !out.paths.is_empty() {
            out.receiver = Some(Box::new(LocalReceiver {
                state: Arc::clone(&self.state),
            }));
        }
        Ok(out)
    }

    async fn supply(
        &self,
        paths: &[String],
        _signatures: &[crate::types::Signature],
        mut receiver: Box<dyn Receiver>,
    ) -> Result<(), EndpointError> {
        let files: Vec<StagedFile> = {
            let state = self.state.lock();
            if state.shutdown {
                return Err(EndpointError::NotConnected);
            }
            paths
                .iter()
                .filter_map(|path| match entry_at(&state.archive.content, path) {
                    Some(Entry::File { digest, executable }) => Some(StagedFile {
                        path: path.clone(),
                        digest: *digest,
                        content: state.blobs.get(digest).cloned().unwrap_or_default(),
                        executable: *executable,
                    }),
                    _ => None,
                })
                .collect()
        };
        for file in files {
            receiver.receive(file).await?;
        }
        receiver.finalize().await
    }

    async fn transition(
        &self,
        cancel: &CancellationToken,
        transitions: &[Change],
    ) -> Result<TransitionOutcome, EndpointError> {
        let mut out = TransitionOutcome::empty();
        for change in transitions {
            if cancel.is_cancelled() {
                return Err(EndpointError::Cancelled);
            }

            let deps = transition_dependencies(std::slice::from_ref(change));
            let missing: Vec<_> = {
                let state = self.state.lock();
                deps.iter()
                    .filter(|dep| !state.blobs.contains_key(&dep.digest))
                    .cloned()
                    .collect()
            };
            if !missing.is_empty() {
                out.missing_files = true;
                out.problems.push(Problem::new(
                    change.path.clone(),
                    "staged content missing for transition",
                ));
                out.results
                    .push(entry_at(&self.state.lock().archive.content, &change.path).cloned());
                continue;
            }

            let mut state = self.state.lock();
            match state.archive.apply(std::slice::from_ref(change)) {
                Ok(updated) => {
                    state.archive = updated;
                    out.results
                        .push(entry_at(&state.archive.content, &change.path).cloned());
                }
                Err(_) => {
                    out.problems.push(Problem::new(
                        change.path.clone(),
                        "transition does not apply to current content",
                    ));
                    out.results
                        .push(entry_at(&state.archive.content, &change.path).cloned());
                }
            }
        }
        Ok(out)
    }

    async fn shutdown(&self) {
        let mut state = self.state.lock();
        if !state.shutdown {
            tracing::debug!("local endpoint shutting down");
        }
        state.shutdown = true;
    }
}

struct LocalReceiver {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl Receiver for LocalReceiver {
    async fn receive(&mut self, file: StagedFile) -> Result<(), EndpointError> {
        self.state.lock().blobs.insert(file.digest, file.content);
        Ok(())
    }

    async fn finalize(&mut self) -> Result<(), EndpointError> {
        Ok(())
    }
}
