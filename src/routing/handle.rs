//! Handler types shared by the router and everything registered on it

use futures_util::future::BoxFuture;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Request as seen by the router: headers plus a fully collected body
pub type HttpRequest = hyper::Request<Bytes>;

/// Response produced by every handler
pub type HttpResponse = Response<Full<Bytes>>;

/// Path parameters bound during lookup, keyed by the name in the route template
pub type Params = HashMap<String, String>;

/// Request passed to a route handler
#[derive(Debug)]
pub struct Request {
    pub http: HttpRequest,
    pub parameters: Params,
}

impl Request {
    /// Value bound to a `:name` or `*name` template segment
    pub fn param(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

/// Route handler
pub type Handle = Arc<dyn Fn(Request) -> BoxFuture<'static, HttpResponse> + Send + Sync>;

/// Handler for requests the routing table cannot dispatch (404, 405, 429)
pub type ErrorHandle = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// Wrap an async function as a [`Handle`]
///
/// # Examples
/// ```
/// use waypost::routing::{handle_fn, Request};
/// use http_body_util::Full;
/// use hyper::body::Bytes;
/// use hyper::Response;
///
/// let hello = handle_fn(|req: Request| async move {
///     let name = req.param("name").unwrap_or("world").to_string();
///     Response::new(Full::new(Bytes::from(format!("hello {name}"))))
/// });
/// # drop(hello);
/// ```
pub fn handle_fn<F, Fut>(f: F) -> Handle
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Wrap a plain function as an [`ErrorHandle`]
pub fn error_handle_fn<F>(f: F) -> ErrorHandle
where
    F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
{
    Arc::new(f)
}
