//! [`Connector`]: how the controller turns a session's `alphaURL`/`betaURL`
//! into a live [`Endpoint`] handle.
//!
//! Real transports (SSH, container exec, Docker) are out-of-scope
//! collaborators (spec §1); this trait is the seam they'd implement. The
//! controller calls it once per reconnect attempt and tolerates failure by
//! retrying after a backoff (spec §4.2 step 1).

use async_trait::async_trait;

use crate::endpoint_trait::Endpoint;
use crate::error::EndpointError;

#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial `url` and return a ready-to-use endpoint, or the error that
    /// prevented connection.
    async fn connect(&self, url: &str) -> Result<Box<dyn Endpoint>, EndpointError>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use crate::local::LocalEndpoint;
    use std::collections::HashMap;
    use std::sync::Arc;

    use parking_lot::Mutex;

    /// A [`Connector`] over a fixed table of pre-built [`LocalEndpoint`]s,
    /// keyed by URL. Tests register endpoints up front and can flip
    /// `fail_next`/`unavailable` to exercise the controller's reconnect
    /// and backoff paths.
    #[derive(Clone, Default)]
    pub struct LocalConnector {
        endpoints: Arc<Mutex<HashMap<String, LocalEndpoint>>>,
        unavailable: Arc<Mutex<HashMap<String, bool>>>,
    }

    impl LocalConnector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn register(&self, url: impl Into<String>, endpoint: LocalEndpoint) {
            self.endpoints.lock().insert(url.into(), endpoint);
        }

        /// Make `url` fail to connect until [`LocalConnector::set_available`]
        /// is called with `true`.
        pub fn set_available(&self, url: impl Into<String>, available: bool) {
            self.unavailable.lock().insert(url.into(), !available);
        }
    }

    #[async_trait]
    impl Connector for LocalConnector {
        async fn connect(&self, url: &str) -> Result<Box<dyn Endpoint>, EndpointError> {
            if *self.unavailable.lock().get(url).unwrap_or(&false) {
                return Err(EndpointError::NotConnected);
            }
            let endpoint = self
                .endpoints
                .lock()
                .get(url)
                .cloned()
                .ok_or_else(|| EndpointError::Other(format!("no endpoint registered for {url}")))?;
            Ok(Box::new(endpoint))
        }
    }
}
