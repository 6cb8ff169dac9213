//! The `Endpoint` contract: the sole abstraction seam between the
//! controller and a concrete transport. This crate defines the trait and,
//! behind the `test-support` feature, an in-process implementation used by
//! the engine and manager crates' tests.

mod connector;
mod endpoint_trait;
mod error;
mod receiver;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod local;

pub use connector::Connector;
#[cfg(any(test, feature = "test-support"))]
pub use connector::test_support;
pub use endpoint_trait::Endpoint;
pub use error::EndpointError;
pub use receiver::Receiver;
pub use types::{
    transition_dependencies, ScanOutcome, Signature, StageOutcome, StagedFile,
    TransitionDependency, TransitionOutcome,
};
