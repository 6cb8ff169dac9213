//! Live view types: [`State`], [`EndpointState`], and truncated list responses.

use crate::conflict::Conflict;
use crate::session::Session;
use crate::status::Status;
use serde::{Deserialize, Serialize};

/// Default truncation limits (spec §6): 10 conflicts, 10 scan problems per
/// endpoint, 10 transition problems per endpoint.
pub const DEFAULT_CONFLICT_LIMIT: usize = 10;
pub const DEFAULT_SCAN_PROBLEM_LIMIT: usize = 10;
pub const DEFAULT_TRANSITION_PROBLEM_LIMIT: usize = 10;

/// A per-path diagnostic surfaced by a scan or transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub path: String,
    pub error: String,
}

impl Problem {
    pub fn new(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            error: error.into(),
        }
    }
}

/// A list response truncated to `limit` entries, with the number excluded
/// surfaced as `excluded` (wire field `excluded<Kind>`, spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Truncated<T> {
    pub items: Vec<T>,
    pub excluded: u64,
}

impl<T> Truncated<T> {
    pub fn from_full(mut full: Vec<T>, limit: usize) -> Self {
        if full.len() <= limit {
            return Self {
                items: full,
                excluded: 0,
            };
        }
        let excluded = (full.len() - limit) as u64;
        full.truncate(limit);
        Self {
            items: full,
            excluded,
        }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            excluded: 0,
        }
    }
}

/// Progress of an in-flight rsync hand-off for a single path (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingProgress {
    pub path: String,
    pub received_size: u64,
    pub expected_size: u64,
    pub files_staged: u64,
    pub files_total: u64,
}

/// `{ connected, scanned, directories, files, symbolicLinks, totalFileSize,
/// scanProblems(truncated), transitionProblems(truncated), stagingProgress? }`
/// (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointState {
    pub connected: bool,
    pub scanned: bool,
    pub directories: u64,
    pub files: u64,
    pub symbolic_links: u64,
    pub total_file_size: u64,
    pub scan_problems: Truncated<Problem>,
    pub transition_problems: Truncated<Problem>,
    pub staging_progress: Option<StagingProgress>,
}

impl EndpointState {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            scanned: false,
            directories: 0,
            files: 0,
            symbolic_links: 0,
            total_file_size: 0,
            scan_problems: Truncated::empty(),
            transition_problems: Truncated::empty(),
            staging_progress: None,
        }
    }
}

/// `{ session, status, lastError, successfulCycles, conflicts(truncated),
/// alphaState, betaState }` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub session: Session,
    pub status: Status,
    pub last_error: Option<String>,
    pub successful_cycles: u64,
    pub conflicts: Truncated<Conflict>,
    pub alpha_state: EndpointState,
    pub beta_state: EndpointState,
}
