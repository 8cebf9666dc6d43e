//! I/O side of fetching.
//!
//! Transports perform the network exchange, the dispatcher picks one by
//! scheme, and each fetch is driven through a [`FetchSession`] that feeds the
//! body into a [`DecodePipeline`]. [`HttpFetch`] ties these together.

mod client;
mod dispatch;
mod pipeline;
mod session;
mod transport;

pub use client::HttpFetch;
pub use dispatch::Dispatcher;
pub use pipeline::{CharsetStage, DecodePipeline, GzipStage};
pub use session::FetchSession;
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{BoxStream, ResponseHead, Transport, TransportResponse};
