//! Router: the routing table behind a reader/writer lock
//!
//! Lookups hold the read lock for the whole handler run, so a route is never
//! removed under an in-flight request. Registration and removal take the write
//! lock. The lock is fair: a waiting writer blocks new dispatches until it is done.

use super::endpoint::{Endpoint, Lookup};
use super::error::RouteError;
use super::fallback::Fallbacks;
use super::handle::{ErrorHandle, Handle, HttpRequest, HttpResponse, Request};
use crate::handler::static_files::{StaticFiles, StaticOptions};
use crate::http;
use futures_util::FutureExt;
use hyper::Method;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Methods accepted by [`Router::handle`]
const STANDARD_METHODS: [Method; 9] = [
    Method::CONNECT,
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
    Method::TRACE,
];

/// Parameter name bound by [`Router::serve_files`] routes
pub const STATIC_PATH_PARAMETER: &str = "path";

/// HTTP router, cheap to clone and share between connections
#[derive(Clone)]
pub struct Router {
    inner: Arc<Inner>,
}

struct Inner {
    table: RwLock<Endpoint>,
    fallbacks: Arc<Fallbacks>,
    static_options: StaticOptions,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::with_static_options(StaticOptions::default())
    }

    /// Router whose [`serve_files`](Self::serve_files) mounts use `options`
    pub fn with_static_options(options: StaticOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: RwLock::new(Endpoint::new()),
                fallbacks: Arc::new(Fallbacks::default()),
                static_options: options,
            }),
        }
    }

    pub fn static_options(&self) -> &StaticOptions {
        &self.inner.static_options
    }

    pub fn set_not_found_handle(&self, handle: ErrorHandle) {
        self.inner.fallbacks.set_not_found(handle);
    }

    pub fn set_method_not_allowed_handle(&self, handle: ErrorHandle) {
        self.inner.fallbacks.set_method_not_allowed(handle);
    }

    pub fn set_rate_limited_handle(&self, handle: ErrorHandle) {
        self.inner.fallbacks.set_rate_limited(handle);
    }

    /// Register a handler, returning an error if the route is invalid or collides
    /// with an existing one
    pub async fn try_handle(&self, method: &str, path: &str, handle: Handle) -> Result<(), RouteError> {
        let method = parse_method(method)?;
        if !path.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash(path.to_string()));
        }

        self.inner.table.write().await.insert(method.clone(), path, handle)?;
        debug!(%method, path, "Registered route");
        Ok(())
    }

    /// Register a handler
    ///
    /// # Panics
    /// Panics if the method is not a standard HTTP method, the path does not start
    /// with `/`, or the route collides with an existing one.
    pub async fn handle(&self, method: &str, path: &str, handle: Handle) {
        if let Err(e) = self.try_handle(method, path, handle).await {
            panic!("{e}");
        }
    }

    /// Remove a handler. `("*", "*")` removes every route.
    ///
    /// Unknown routes, empty paths and paths without a leading `/` are ignored.
    pub async fn remove_handle(&self, method: &str, path: &str) {
        if method == "*" && path == "*" {
            self.inner.table.write().await.clear();
            debug!("Removed all routes");
            return;
        }
        if !path.starts_with('/') {
            return;
        }
        let Ok(method) = Method::from_bytes(method.as_bytes()) else {
            return;
        };

        if self.inner.table.write().await.remove(&method, path) {
            debug!(%method, path, "Removed route");
        }
    }

    /// Serve files under `local_root` for every path below `url_prefix`
    ///
    /// Registers `GET` and `HEAD` on `<url_prefix>/*path`.
    pub async fn serve_files(
        &self,
        local_root: impl Into<PathBuf>,
        url_prefix: &str,
    ) -> Result<(), RouteError> {
        let options = self.inner.static_options.clone();
        self.serve_files_with(local_root, url_prefix, options).await
    }

    /// [`serve_files`](Self::serve_files) with mount-specific options
    pub async fn serve_files_with(
        &self,
        local_root: impl Into<PathBuf>,
        url_prefix: &str,
        options: StaticOptions,
    ) -> Result<(), RouteError> {
        let mut prefix = url_prefix.to_string();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        if !prefix.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash(prefix));
        }
        let template = format!("{prefix}*{STATIC_PATH_PARAMETER}");

        let engine = Arc::new(StaticFiles::new(
            local_root.into(),
            prefix,
            options,
            Arc::clone(&self.inner.fallbacks),
        ));
        let handle = engine.into_handle();

        let mut table = self.inner.table.write().await;
        table.insert(Method::GET, &template, Arc::clone(&handle))?;
        if let Err(e) = table.insert(Method::HEAD, &template, handle) {
            table.remove(&Method::GET, &template);
            return Err(e);
        }
        drop(table);

        debug!(%template, "Serving static files");
        Ok(())
    }

    /// Dispatch a request
    ///
    /// A panic in the handler is logged and answered with 500; the router keeps
    /// serving.
    pub async fn serve(&self, req: HttpRequest) -> HttpResponse {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let table = self.inner.table.read().await;
        let outcome = AssertUnwindSafe(self.dispatch(&table, req))
            .catch_unwind()
            .await;
        drop(table);

        match outcome {
            Ok(response) => response,
            Err(payload) => {
                error!(
                    %method,
                    %path,
                    panic = panic_message(payload.as_ref()),
                    "Recovered from panic in request handler"
                );
                http::build_500_response()
            }
        }
    }

    /// Answer with the configured not-found handler without touching the table
    pub fn not_found(&self, req: &HttpRequest) -> HttpResponse {
        self.inner.fallbacks.not_found(req)
    }

    /// Answer with the configured rate-limit handler
    pub fn rate_limited(&self, req: &HttpRequest) -> HttpResponse {
        self.inner.fallbacks.rate_limited(req)
    }

    async fn dispatch(&self, table: &Endpoint, req: HttpRequest) -> HttpResponse {
        match table.lookup(req.method(), req.uri().path()) {
            Lookup::Found { handle, parameters } => {
                handle(Request {
                    http: req,
                    parameters,
                })
                .await
            }
            Lookup::MethodNotAllowed => self.inner.fallbacks.method_not_allowed(&req),
            Lookup::NotFound => self.inner.fallbacks.not_found(&req),
        }
    }
}

fn parse_method(method: &str) -> Result<Method, RouteError> {
    STANDARD_METHODS
        .iter()
        .find(|m| m.as_str() == method)
        .cloned()
        .ok_or_else(|| RouteError::InvalidMethod(method.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handle::{error_handle_fn, handle_fn};
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::{Response, StatusCode};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn request(method: &str, path: &str) -> HttpRequest {
        hyper::Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    fn text(body: &'static str) -> Handle {
        handle_fn(move |_| async move { Response::new(Full::new(Bytes::from(body))) })
    }

    fn echo(name: &'static str) -> Handle {
        handle_fn(move |req: Request| async move {
            let value = req.param(name).unwrap_or_default().to_string();
            Response::new(Full::new(Bytes::from(value)))
        })
    }

    fn explode() -> HttpResponse {
        panic!("handler exploded")
    }

    async fn body_string(resp: HttpResponse) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serve_registered_route() {
        let router = Router::new();
        router.handle("GET", "/users/:id", echo("id")).await;

        let resp = router.serve(request("GET", "/users/42")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "42");
    }

    #[tokio::test]
    async fn test_wildcard_with_param() {
        let router = Router::new();
        router.handle("GET", "/repo/:owner/*file", echo("file")).await;

        let resp = router.serve(request("GET", "/repo/alice/src/main.rs")).await;
        assert_eq!(body_string(resp).await, "src/main.rs");
    }

    #[tokio::test]
    async fn test_not_found_and_method_not_allowed() {
        let router = Router::new();
        router.handle("GET", "/only-get", text("ok")).await;

        assert_eq!(
            router.serve(request("POST", "/only-get")).await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            router.serve(request("GET", "/nothing")).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_custom_fallback_handles() {
        let router = Router::new();
        router.handle("GET", "/x", text("ok")).await;
        router.set_not_found_handle(error_handle_fn(|_| {
            Response::new(Full::new(Bytes::from("custom 404")))
        }));
        router.set_method_not_allowed_handle(error_handle_fn(|_| {
            Response::new(Full::new(Bytes::from("custom 405")))
        }));

        assert_eq!(
            body_string(router.serve(request("GET", "/y")).await).await,
            "custom 404"
        );
        assert_eq!(
            body_string(router.serve(request("PUT", "/x")).await).await,
            "custom 405"
        );
    }

    #[tokio::test]
    async fn test_root_wildcard_catches_everything() {
        let router = Router::new();
        router.handle("GET", "/*path", echo("path")).await;

        let resp = router.serve(request("GET", "/a/b/")).await;
        assert_eq!(body_string(resp).await, "a/b/");
        assert_eq!(
            router.serve(request("POST", "/a")).await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[tokio::test]
    async fn test_remove_then_register_again() {
        let router = Router::new();
        router.handle("GET", "/thing", text("one")).await;
        assert!(router.try_handle("GET", "/thing", text("dup")).await.is_err());

        router.remove_handle("GET", "/thing").await;
        assert_eq!(
            router.serve(request("GET", "/thing")).await.status(),
            StatusCode::NOT_FOUND
        );

        router.handle("GET", "/thing", text("two")).await;
        assert_eq!(
            body_string(router.serve(request("GET", "/thing")).await).await,
            "two"
        );
    }

    #[tokio::test]
    async fn test_remove_all() {
        let router = Router::new();
        router.handle("GET", "/a", text("a")).await;
        router.handle("POST", "/b/:id", text("b")).await;
        router.handle("GET", "/c/*rest", text("c")).await;

        router.remove_handle("*", "*").await;

        for (method, path) in [("GET", "/a"), ("POST", "/b/1"), ("GET", "/c/d/e")] {
            assert_eq!(
                router.serve(request(method, path)).await.status(),
                StatusCode::NOT_FOUND
            );
        }
    }

    #[tokio::test]
    async fn test_remove_ignores_invalid_paths() {
        let router = Router::new();
        router.handle("GET", "/a", text("a")).await;
        router.remove_handle("GET", "").await;
        router.remove_handle("GET", "a").await;
        router.remove_handle("GET", "/never").await;
        assert_eq!(
            router.serve(request("GET", "/a")).await.status(),
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_invalid_registrations() {
        let router = Router::new();
        assert_eq!(
            router.try_handle("FETCH", "/a", text("a")).await,
            Err(RouteError::InvalidMethod("FETCH".to_string()))
        );
        assert_eq!(
            router.try_handle("get", "/a", text("a")).await,
            Err(RouteError::InvalidMethod("get".to_string()))
        );
        assert_eq!(
            router.try_handle("GET", "a", text("a")).await,
            Err(RouteError::MissingLeadingSlash("a".to_string()))
        );
    }

    #[tokio::test]
    #[should_panic(expected = "duplicate route")]
    async fn test_handle_panics_on_collision() {
        let router = Router::new();
        router.handle("GET", "/dup", text("a")).await;
        router.handle("GET", "/dup", text("b")).await;
    }

    #[tokio::test]
    async fn test_handler_panic_returns_500() {
        let router = Router::new();
        router
            .handle(
                "GET",
                "/boom",
                handle_fn(|_| async { explode() }),
            )
            .await;
        router.handle("GET", "/fine", text("fine")).await;

        let resp = router.serve(request("GET", "/boom")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // Lock was released: registration and dispatch both still work
        router.handle("GET", "/after", text("after")).await;
        assert_eq!(
            body_string(router.serve(request("GET", "/fine")).await).await,
            "fine"
        );
        assert_eq!(
            body_string(router.serve(request("GET", "/after")).await).await,
            "after"
        );
    }

    #[tokio::test]
    async fn test_writer_waits_for_in_flight_handler() {
        let router = Router::new();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let (entered_tx, release_rx) = (Arc::clone(&entered), Arc::clone(&release));
        router
            .handle(
                "GET",
                "/slow",
                handle_fn(move |_| {
                    let (entered, release) = (Arc::clone(&entered_tx), Arc::clone(&release_rx));
                    async move {
                        entered.notify_one();
                        release.notified().await;
                        Response::new(Full::new(Bytes::from("slow")))
                    }
                }),
            )
            .await;

        let in_flight = {
            let router = router.clone();
            tokio::spawn(async move { router.serve(request("GET", "/slow")).await })
        };
        entered.notified().await;

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            router.remove_handle("GET", "/slow"),
        )
        .await;
        assert!(blocked.is_err(), "removal must wait for the running handler");

        release.notify_one();
        let resp = in_flight.await.unwrap();
        assert_eq!(body_string(resp).await, "slow");

        router.remove_handle("GET", "/slow").await;
        assert_eq!(
            router.serve(request("GET", "/slow")).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
