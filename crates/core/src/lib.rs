//! Shared domain types for synchronization sessions: content trees, changes,
//! conflicts, sessions, and the wire-visible state views built from them.

pub mod archive;
pub mod change;
pub mod clock;
pub mod conflict;
pub mod entry;
pub mod id;
pub mod macros;
pub mod mode;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod status;

pub use archive::{Archive, ArchiveError};
pub use change::{Change, ChangeKind};
pub use clock::{Clock, FakeClock, SystemClock};
pub use conflict::Conflict;
pub use entry::{Digest, Entry, EntryError};
pub use id::SessionId;
pub use mode::SynchronizationMode;
pub use session::{Configuration, Session, CURRENT_SESSION_VERSION};
pub use snapshot::Snapshot;
pub use state::{
    EndpointState, Problem, State, StagingProgress, Truncated, DEFAULT_CONFLICT_LIMIT,
    DEFAULT_SCAN_PROBLEM_LIMIT, DEFAULT_TRANSITION_PROBLEM_LIMIT,
};
pub use status::Status;
