//! Fetch web pages over HTTP/HTTPS and return their text as UTF-8.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Option trees, request snapshots and client settings
//! - [`core`] - Pure transformations (merging, serialization, charset and URL handling)
//! - [`effects`] - Transports, body decoding and the fetch session
//!
//! # Key Features
//!
//! - **Option Templates**: Headers and defaults persist on the client and are deep-merged per call
//! - **Streaming Decode**: Gzip and charset conversion run chunk by chunk as the body arrives
//! - **Charset Detection**: `Charset=` in the Content-Type overrides the client default
//! - **Exactly-Once Completion**: Every fetch ends in one success or one error, never both

mod core;
mod data;
mod effects;
mod error;

pub use crate::core::{
    DEFAULT_JOINER, Target, codec_name, deep_merge, detect_charset, detect_charset_lenient,
    resolve_encoding, resolve_target, serialize, serialize_with, snapshot,
};
pub use data::{
    DEFAULT_CHARSET, DEFAULT_HEADERS, DEFAULT_METHOD, DEFAULT_PATH, DEFAULT_USER_AGENT,
    FetchConfig, OptionMap, OptionValue, RequestOptions, RequestSnapshot,
    Scheme, SessionState, default_headers, option_map, options_from_json,
};
#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;
pub use effects::{
    BoxStream, CharsetStage, DecodePipeline, Dispatcher, FetchSession, GzipStage, HttpFetch,
    ResponseHead, Transport, TransportResponse,
};
pub use error::{FetchError, Result};
