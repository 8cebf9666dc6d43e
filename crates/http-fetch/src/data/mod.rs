//! Data types for fetch configuration and per-request state.
//!
//! Option trees, request snapshots, client settings and session phases live
//! here. Nothing in this module performs I/O.

pub mod config;
pub mod options;
pub mod request;
pub mod state;

pub use config::{DEFAULT_CHARSET, FetchConfig};
pub use options::{
    DEFAULT_HEADERS, DEFAULT_METHOD, DEFAULT_PATH, DEFAULT_USER_AGENT, OptionMap,
    OptionValue, RequestOptions, default_headers, option_map, options_from_json,
};
pub use request::{RequestSnapshot, Scheme};
pub use state::SessionState;
