//! The synchronization engine: the pure reconciler, safety gates, the
//! rsync stager coordinator, the change tracker, and the controller run
//! loop that wires them together (spec §4).

pub mod controller;
pub mod error;
pub mod reconcile;
pub mod safety;
pub mod stage;
pub mod tracker;

pub use controller::{Controller, ControllerHandle, HaltMode};
pub use error::{ControllerError, ReconcileError};
pub use reconcile::{reconcile, Reconciliation};
pub use safety::{contains_root_deletion, contains_root_type_change, one_endpoint_emptied_root};
pub use stage::{stage_one_side, MonitoringReceiver, PreemptableReceiver, ProgressSlot};
pub use tracker::ChangeTracker;
