//! Scheme-based transport selection.

use std::collections::HashMap;

use tracing::debug;

use crate::data::{RequestSnapshot, Scheme};
use crate::effects::transport::{Transport, TransportResponse};
use crate::error::{FetchError, Result};

/// Registry mapping each scheme to the transport that serves it.
pub struct Dispatcher {
    transports: HashMap<Scheme, Box<dyn Transport>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            transports: HashMap::new(),
        }
    }

    /// Dispatcher with `reqwest` transports for `http` and `https`.
    #[cfg(feature = "reqwest")]
    pub fn with_defaults() -> Result<Self> {
        use crate::effects::transport::ReqwestTransport;

        let mut dispatcher = Self::new();
        dispatcher.register(Box::new(ReqwestTransport::plain()?));
        dispatcher.register(Box::new(ReqwestTransport::tls()?));
        Ok(dispatcher)
    }

    /// Register a transport, replacing any previous one for its scheme.
    pub fn register(&mut self, transport: Box<dyn Transport>) {
        self.transports.insert(transport.scheme(), transport);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, transport: Box<dyn Transport>) -> Self {
        self.register(transport);
        self
    }

    pub fn get(&self, scheme: Scheme) -> Option<&dyn Transport> {
        self.transports.get(&scheme).map(|transport| transport.as_ref())
    }

    pub fn schemes(&self) -> Vec<Scheme> { self.transports.keys().copied().collect() }

    /// Send `request` through the transport registered for its scheme.
    ///
    /// # Errors
    ///
    /// [`FetchError::UnsupportedProtocol`] if no transport serves the scheme;
    /// otherwise whatever the transport returns.
    pub async fn dispatch(&self, request: &RequestSnapshot) -> Result<TransportResponse> {
        let transport = self
            .get(request.scheme)
            .ok_or_else(|| FetchError::UnsupportedProtocol(format!("{}:", request.scheme)))?;

        debug!(method = %request.method, url = %request.url(), "dispatching request");
        transport.send(request).await
    }
}

impl Default for Dispatcher {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("schemes", &self.schemes()).finish()
    }
}
