//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from routing.
//! Shared by the static file engine, the router fallbacks and the server front-end.

pub mod cache;
pub mod mime;
pub mod multipart;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use mime::{ExtensionMimeResolver, MimeResolver};
pub use range::{parse_range_header, ByteRange, RangeError, ResolvedRange};
pub use response::{
    build_400_response, build_404_response, build_405_response, build_413_response,
    build_416_response, build_429_response, build_500_response,
};
