//! Error types for http-fetch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("gzip decompression failed: {0}")]
    Decompression(String),

    #[error("charset conversion failed: {0}")]
    CharsetConversion(String),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Map any transport-level error into [`FetchError::Transport`].
    pub fn transport<E: std::error::Error>(e: E) -> Self { FetchError::Transport(e.to_string()) }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
