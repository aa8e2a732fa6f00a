//! Request handler module
//!
//! Connection-facing dispatch plus the static file engine mounted by
//! [`Router::serve_files`](crate::routing::Router::serve_files).

pub mod dir_index;
pub mod dispatch;
pub mod static_files;

// Re-export main entry point
pub use dispatch::{handle_request, DispatchContext};
