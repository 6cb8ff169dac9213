//! [`Manager`]: registry of [`Controller`]s keyed by session identifier,
//! with selector-based bulk lifecycle operations (spec §2 "Manager").

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use duet_core::{Configuration, Session, SessionId, State, SystemClock};
use duet_endpoint::Connector;
use duet_engine::{Controller, ControllerHandle, HaltMode};
use parking_lot::RwLock;

use crate::error::ManagerError;
use crate::selector::Selector;

/// Where session and archive files live on disk (spec §6.2:
/// `<sessions_dir>/<identifier>`, `<archives_dir>/<identifier>`).
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub sessions_dir: PathBuf,
    pub archives_dir: PathBuf,
}

impl ManagerConfig {
    /// Derive the `sessions`/`archives` subdirectories from one state root.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            sessions_dir: root.join("sessions"),
            archives_dir: root.join("archives"),
        }
    }

    pub fn session_path(&self, id: &SessionId) -> PathBuf {
        self.sessions_dir.join(id.as_str())
    }

    pub fn archive_path(&self, id: &SessionId) -> PathBuf {
        self.archives_dir.join(id.as_str())
    }
}

struct Entry {
    name: String,
    labels: BTreeMap<String, String>,
    controller: ControllerHandle,
}

/// Owns the controller map; each [`Controller`] exclusively owns its run
/// loop and endpoints while running (spec §3 "Ownership").
pub struct Manager {
    config: ManagerConfig,
    connector: Arc<dyn Connector>,
    sessions: RwLock<HashMap<SessionId, Entry>>,
}

impl Manager {
    /// An empty registry rooted at `config`; no sessions are loaded from disk.
    pub fn new(config: ManagerConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Load every persisted session under `config.sessions_dir` and resume
    /// each one that wasn't left paused.
    pub async fn load(config: ManagerConfig, connector: Arc<dyn Connector>) -> Result<Self, ManagerError> {
        std::fs::create_dir_all(&config.sessions_dir)
            .map_err(|source| storage_io_err(&config.sessions_dir, source))?;
        std::fs::create_dir_all(&config.archives_dir)
            .map_err(|source| storage_io_err(&config.archives_dir, source))?;
        let manager = Self::new(config, connector);

        let entries = std::fs::read_dir(&manager.config.sessions_dir)
            .map_err(|source| storage_io_err(&manager.config.sessions_dir, source))?;

        let mut to_resume = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| storage_io_err(&manager.config.sessions_dir, source))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(session) = duet_storage::read_session(&path)? else {
                continue;
            };
            let paused = session.paused;
            let controller = manager.insert(session);
            if !paused {
                to_resume.push(controller);
            }
        }
        for controller in to_resume {
            controller.resume().await?;
        }
        tracing::info!(count = manager.sessions.read().len(), "loaded sessions from disk");
        Ok(manager)
    }

    fn insert(&self, session: Session) -> ControllerHandle {
        let id = session.identifier.clone();
        let name = session.name.clone();
        let labels = session.labels.clone();
        let controller = Controller::new(
            session,
            self.config.session_path(&id),
            self.config.archive_path(&id),
            Arc::clone(&self.connector),
            SystemClock,
        );
        self.sessions.write().insert(
            id,
            Entry {
                name,
                labels,
                controller: controller.clone(),
            },
        );
        controller
    }

    /// Create a new session, persist it and an empty archive, and start it
    /// running (spec §3 "Session: created by Manager.Create; persisted
    /// immediately").
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        alpha_url: impl Into<String>,
        beta_url: impl Into<String>,
        configuration: Configuration,
        name: impl Into<String>,
        labels: BTreeMap<String, String>,
        created_at_epoch_ms: u64,
    ) -> Result<SessionId, ManagerError> {
        let mut session = Session::new(alpha_url, beta_url, configuration, created_at_epoch_ms).name(name);
        session.labels = labels;
        let id = session.identifier.clone();

        duet_storage::write_session(&self.config.session_path(&id), &session)?;
        duet_storage::write_archive(&self.config.archive_path(&id), &duet_core::Archive::empty())?;

        let controller = self.insert(session);
        controller.resume().await?;
        tracing::info!(session = %id, "session created");
        Ok(id)
    }

    fn select_entries(&self, selector: &Selector) -> Result<Vec<(SessionId, ControllerHandle)>, ManagerError> {
        let sessions = self.sessions.read();
        match selector {
            Selector::All => Ok(sessions
                .iter()
                .map(|(id, entry)| (id.clone(), entry.controller.clone()))
                .collect()),
            Selector::Names(names) => {
                let mut matched = Vec::new();
                for name in names {
                    let mut found = false;
                    for (id, entry) in sessions.iter() {
                        if id.as_str() == name.as_str() || entry.name == *name {
                            matched.push((id.clone(), entry.controller.clone()));
                            found = true;
                        }
                    }
                    if !found {
                        return Err(ManagerError::NoMatch(name.clone()));
                    }
                }
                Ok(matched)
            }
            Selector::Labels(requirements) => {
                let matched: Vec<_> = sessions
                    .iter()
                    .filter(|(_, entry)| requirements.iter().all(|r| r.matches(&entry.labels)))
                    .map(|(id, entry)| (id.clone(), entry.controller.clone()))
                    .collect();
                if matched.is_empty() {
                    return Err(ManagerError::NoMatch(format!("{requirements:?}")));
                }
                Ok(matched)
            }
        }
    }

    fn select(&self, selector: &Selector) -> Result<Vec<ControllerHandle>, ManagerError> {
        Ok(self.select_entries(selector)?.into_iter().map(|(_, c)| c).collect())
    }

    /// Live state for every session matching `selector` (spec §6 "List").
    pub fn list(&self, selector: &Selector) -> Result<Vec<State>, ManagerError> {
        Ok(self.select(selector)?.iter().map(|c| c.current_state()).collect())
    }

    pub async fn pause(&self, selector: &Selector) -> Result<(), ManagerError> {
        for controller in self.select(selector)? {
            controller.halt(HaltMode::Pause).await?;
        }
        Ok(())
    }

    pub async fn resume(&self, selector: &Selector) -> Result<(), ManagerError> {
        for controller in self.select(selector)? {
            controller.resume().await?;
        }
        Ok(())
    }

    pub async fn flush(&self, selector: &Selector, skip_wait: bool) -> Result<(), ManagerError> {
        for controller in self.select(selector)? {
            controller.flush(skip_wait).await?;
        }
        Ok(())
    }

    pub async fn reset(&self, selector: &Selector) -> Result<(), ManagerError> {
        for controller in self.select(selector)? {
            controller.reset().await?;
        }
        Ok(())
    }

    /// Terminate every selected session: disables its controller, deletes
    /// its files, and drops it from the registry.
    pub async fn terminate(&self, selector: &Selector) -> Result<(), ManagerError> {
        let targets = self.select_entries(selector)?;
        for (id, controller) in &targets {
            controller.halt(HaltMode::Terminate).await?;
            self.sessions.write().remove(id);
            tracing::info!(session = %id, "session terminated");
        }
        Ok(())
    }

    /// Number of sessions currently in the registry, regardless of status.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn storage_io_err(path: &std::path::Path, source: std::io::Error) -> ManagerError {
    ManagerError::Storage(duet_storage::StorageError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
