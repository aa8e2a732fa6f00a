//! Replaceable handlers for requests the routing table does not dispatch

use super::handle::{error_handle_fn, ErrorHandle, HttpRequest, HttpResponse};
use crate::http;
use std::sync::{Arc, PoisonError, RwLock};

/// 404, 405 and rate-limit handlers, shared between the router and the static file
/// engines it registers
pub struct Fallbacks {
    not_found: RwLock<ErrorHandle>,
    method_not_allowed: RwLock<ErrorHandle>,
    rate_limited: RwLock<ErrorHandle>,
}

impl Default for Fallbacks {
    fn default() -> Self {
        Self {
            not_found: RwLock::new(error_handle_fn(default_not_found)),
            method_not_allowed: RwLock::new(error_handle_fn(default_method_not_allowed)),
            rate_limited: RwLock::new(error_handle_fn(|_| http::build_429_response())),
        }
    }
}

impl Fallbacks {
    pub fn not_found(&self, req: &HttpRequest) -> HttpResponse {
        current(&self.not_found)(req)
    }

    pub fn method_not_allowed(&self, req: &HttpRequest) -> HttpResponse {
        current(&self.method_not_allowed)(req)
    }

    pub fn rate_limited(&self, req: &HttpRequest) -> HttpResponse {
        current(&self.rate_limited)(req)
    }

    pub fn set_not_found(&self, handle: ErrorHandle) {
        replace(&self.not_found, handle);
    }

    pub fn set_method_not_allowed(&self, handle: ErrorHandle) {
        replace(&self.method_not_allowed, handle);
    }

    pub fn set_rate_limited(&self, handle: ErrorHandle) {
        replace(&self.rate_limited, handle);
    }
}

// A panicking error handle never runs while the lock is held, so a poisoned
// lock still holds a valid handle.
fn current(slot: &RwLock<ErrorHandle>) -> ErrorHandle {
    Arc::clone(&slot.read().unwrap_or_else(PoisonError::into_inner))
}

fn replace(slot: &RwLock<ErrorHandle>, handle: ErrorHandle) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = handle;
}

/// True when the client's `Accept` header mentions HTML
pub fn accepts_html(req: &HttpRequest) -> bool {
    req.headers()
        .get(hyper::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.to_ascii_lowercase().contains("html"))
}

fn default_not_found(req: &HttpRequest) -> HttpResponse {
    http::build_404_response(accepts_html(req))
}

fn default_method_not_allowed(req: &HttpRequest) -> HttpResponse {
    http::build_405_response(accepts_html(req))
}
