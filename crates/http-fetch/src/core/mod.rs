//! Pure transformations used by the fetch pipeline.
//!
//! Option merging, body/cookie serialization, charset detection and URL
//! resolution. None of these functions perform I/O.

mod charset;
mod merge;
mod serialize;
mod target;

pub use charset::{codec_name, detect_charset, detect_charset_lenient, resolve_encoding};
pub use merge::deep_merge;
pub use serialize::{DEFAULT_JOINER, serialize, serialize_with};
pub use target::{Target, resolve_target, snapshot};
