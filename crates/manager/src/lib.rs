//! The registry layer: session creation, selection, and bulk lifecycle
//! operations over [`duet_engine::Controller`] (spec §2 "Manager").

mod error;
mod registry;
mod selector;

pub use error::{ManagerError, SelectorError};
pub use registry::{Manager, ManagerConfig};
pub use selector::{LabelRequirement, Selector};
