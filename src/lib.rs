//! Embeddable HTTP router with a static file engine
//!
//! - [`Router`]: method + path trie with `:param` and `*wildcard` segments,
//!   panic recovery and replaceable 404/405 handlers
//! - [`Router::serve_files`]: range requests, multipart byte ranges,
//!   `If-Modified-Since`, directory listings and `Cache-Control`
//! - [`Server`]: HTTP/1.1 front end with body limits and per-client rate limiting

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod security;
pub mod server;

pub use handler::static_files::StaticOptions;
pub use http::{ByteRange, ExtensionMimeResolver, MimeResolver};
pub use routing::{
    error_handle_fn, handle_fn, ErrorHandle, Handle, HttpRequest, HttpResponse, Request,
    RouteError, Router,
};
pub use server::Server;
