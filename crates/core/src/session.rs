//! [`Session`]: the persisted, (almost) immutable session record.

use crate::id::SessionId;
use crate::mode::SynchronizationMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-session reconciliation configuration. Endpoint-specific overlays
/// (`configuration_alpha`/`configuration_beta`) carry the same shape and
/// are merged over `configuration` by the (out-of-scope) config loader
/// before the session is created; the core only needs the merged result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Configuration {
    pub mode: Option<SynchronizationMode>,
}

/// `{ identifier, version, createdAt, alphaURL, betaURL, configuration,
/// configurationAlpha, configurationBeta, name, labels, paused }` (spec §3).
///
/// Immutable except [`Session::paused`], which the controller flips under
/// the state lock during `halt`/`resume`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identifier: SessionId,
    pub version: u32,
    pub created_at_epoch_ms: u64,
    pub alpha_url: String,
    pub beta_url: String,
    pub configuration: Configuration,
    pub configuration_alpha: Configuration,
    pub configuration_beta: Configuration,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub paused: bool,
}

pub const CURRENT_SESSION_VERSION: u32 = 1;

impl Session {
    pub fn new(
        alpha_url: impl Into<String>,
        beta_url: impl Into<String>,
        configuration: Configuration,
        created_at_epoch_ms: u64,
    ) -> Self {
        Self {
            identifier: SessionId::new(),
            version: CURRENT_SESSION_VERSION,
            created_at_epoch_ms,
            alpha_url: alpha_url.into(),
            beta_url: beta_url.into(),
            configuration,
            configuration_alpha: Configuration::default(),
            configuration_beta: Configuration::default(),
            name: String::new(),
            labels: BTreeMap::new(),
            paused: false,
        }
    }

    /// Effective mode once endpoint overlays are applied: an endpoint-side
    /// override wins over the session-wide configuration.
    pub fn effective_mode(&self) -> SynchronizationMode {
        self.configuration
            .mode
            .unwrap_or(SynchronizationMode::TwoWaySafe)
    }

    crate::setters! {
        into { name: String }
        set { paused: bool }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
