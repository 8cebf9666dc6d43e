use std::collections::BTreeMap;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::data::{RequestSnapshot, Scheme};
use crate::error::Result;

/// A boxed stream type for response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Status line and headers of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status:  u16,
    /// Header names are stored lowercase.
    pub headers: BTreeMap<String, String>,
}

impl ResponseHead {
    pub fn new(status: u16) -> Self { Self { status, headers: BTreeMap::new() } }

    /// Add a header; the name is lowercased.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> { self.header("content-type") }

    pub fn content_encoding(&self) -> Option<&str> { self.header("content-encoding") }
}

/// A response whose body has not been read yet.
pub struct TransportResponse {
    pub head: ResponseHead,
    pub body: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("head", &self.head)
            .field("body", &"{ ... }")
            .finish()
    }
}

/// Protocol implementation that performs a single request.
///
/// Implementations open one connection, write the serialized body if the
/// snapshot carries one, and return as soon as the response head is
/// available. They must not retry or follow redirects.
///
/// # Implementations
///
/// - [`ReqwestTransport`]: production implementation using `reqwest`
/// - Mock implementations for testing
#[async_trait]
pub trait Transport: Send + Sync {
    /// The scheme this transport serves.
    fn scheme(&self) -> Scheme;

    /// Send `request` and return the response head with a body stream.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`](crate::FetchError::Transport) for
    /// connection, DNS and socket failures, and for requests that cannot be
    /// built (invalid method or header values).
    async fn send(&self, request: &RequestSnapshot) -> Result<TransportResponse>;
}

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use futures_util::StreamExt;
    use reqwest::redirect::Policy;
    use reqwest::{Client, Method};

    use super::*;
    use crate::error::FetchError;

    /// Transport backed by `reqwest`, one instance per scheme.
    ///
    /// Automatic decompression is not enabled in the client, so bodies reach
    /// the decode pipeline exactly as the server sent them.
    pub struct ReqwestTransport {
        scheme: Scheme,
        client: Client,
    }

    impl ReqwestTransport {
        pub fn new(scheme: Scheme) -> Result<Self> {
            let client = Client::builder()
                .redirect(Policy::none())
                .https_only(scheme == Scheme::Https)
                .build()?;
            Ok(Self { scheme, client })
        }

        /// Transport for `http` URLs.
        pub fn plain() -> Result<Self> { Self::new(Scheme::Http) }

        /// Transport for `https` URLs.
        pub fn tls() -> Result<Self> { Self::new(Scheme::Https) }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        fn scheme(&self) -> Scheme { self.scheme }

        async fn send(&self, request: &RequestSnapshot) -> Result<TransportResponse> {
            if request.scheme != self.scheme {
                return Err(FetchError::Transport(format!(
                    "{} transport cannot serve {} request",
                    self.scheme, request.scheme
                )));
            }

            let method = Method::from_bytes(request.method.as_bytes()).map_err(FetchError::transport)?;
            let mut builder = self.client.request(method, request.url());

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await?;

            let head = ResponseHead {
                status:  response.status().as_u16(),
                headers: response
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
                    })
                    .collect(),
            };
            let body = response.bytes_stream().map(|chunk| chunk.map_err(FetchError::from));

            Ok(TransportResponse { head, body: Box::pin(body) })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let head = ResponseHead::new(200)
            .with_header("Content-Type", "text/html; Charset=gbk")
            .with_header("CONTENT-ENCODING", "gzip");

        assert_eq!(head.content_type(), Some("text/html; Charset=gbk"));
        assert_eq!(head.content_encoding(), Some("gzip"));
        assert_eq!(head.header("content-type"), head.header("CONTENT-TYPE"));
        assert_eq!(head.header("x-missing"), None);
    }

    #[cfg(feature = "reqwest")]
    #[tokio::test]
    async fn reqwest_transport_rejects_other_scheme() {
        let transport = ReqwestTransport::plain().unwrap();
        assert_eq!(transport.scheme(), Scheme::Http);

        let request = RequestSnapshot {
            scheme:   Scheme::Https,
            hostname: "localhost".to_string(),
            port:     443,
            path:     "/".to_string(),
            method:   "GET".to_string(),
            headers:  BTreeMap::new(),
            body:     None,
        };
        let err = transport.send(&request).await.unwrap_err();
        assert!(matches!(err, crate::FetchError::Transport(_)));
    }
}
