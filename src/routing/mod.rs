//! Routing module
//!
//! Maps a request method and path to a registered handler:
//! - Segment trie with literal, `:param` and `*wildcard` segments
//! - Collision detection at registration time
//! - Replaceable 404/405/429 handlers
//! - Panic recovery around handler execution

mod endpoint;
mod error;
mod fallback;
mod handle;
mod router;

pub use endpoint::{parse_template, Segment, SegmentKey};
pub use error::RouteError;
pub use fallback::{accepts_html, Fallbacks};
pub use handle::{
    error_handle_fn, handle_fn, ErrorHandle, Handle, HttpRequest, HttpResponse, Params, Request,
};
pub use router::{Router, STATIC_PATH_PARAMETER};
