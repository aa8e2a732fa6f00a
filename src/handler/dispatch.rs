//! Connection-facing request entry point
//!
//! Applies admission checks (rate limit, body size), collects the body, hands the
//! request to the [`Router`] and writes the access log line.

use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::{HttpResponse, Router};
use crate::security::RateLimiter;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_LENGTH, SERVER};
use hyper::Request;
use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Everything a connection needs to answer requests
pub struct DispatchContext {
    pub router: Router,
    pub max_body_size: u64,
    pub server_name: String,
    pub access_log: bool,
    pub access_log_format: String,
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    peer: SocketAddr,
    ctx: Arc<DispatchContext>,
) -> Result<HttpResponse, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let started = Instant::now();
    let mut entry = AccessLogEntry::from_request(
        peer.ip(),
        req.method(),
        req.uri(),
        req.version(),
        req.headers(),
    );

    let mut response = admit_and_route(req, peer, &ctx).await;

    if let Ok(value) = HeaderValue::from_str(&ctx.server_name) {
        response.headers_mut().insert(SERVER, value);
    }

    if ctx.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &ctx.access_log_format);
    }

    Ok(response)
}

async fn admit_and_route<B>(req: Request<B>, peer: SocketAddr, ctx: &DispatchContext) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();

    if let Some(limiter) = &ctx.rate_limiter {
        if !limiter.check(peer.ip()) {
            warn!(client = %peer.ip(), path = parts.uri.path(), "Rate limit exceeded");
            return ctx.router.rate_limited(&Request::from_parts(parts, Bytes::new()));
        }
    }

    if let Some(resp) = check_body_size(&parts, ctx.max_body_size) {
        return resp;
    }

    let limit = usize::try_from(ctx.max_body_size).unwrap_or(usize::MAX);
    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(max = ctx.max_body_size, "Request body too large");
            return http::build_413_response();
        }
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return http::build_400_response();
        }
    };

    ctx.router.serve(Request::from_parts(parts, body)).await
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(parts: &hyper::http::request::Parts, max_body_size: u64) -> Option<HttpResponse> {
    let content_length = parts.headers.get(CONTENT_LENGTH)?;
    let Ok(size_str) = content_length.to_str() else {
        warn!("Content-Length header contains non-ASCII characters");
        return None;
    };

    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            warn!(size, max = max_body_size, "Request body too large");
            Some(http::build_413_response())
        }
        Err(_) => {
            warn!(value = size_str, "Invalid Content-Length value, skipping size check");
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{handle_fn, Request as RouteRequest};
    use http_body_util::Full;
    use hyper::{Response, StatusCode};

    async fn context(rate_limiter: Option<Arc<RateLimiter>>) -> Arc<DispatchContext> {
        let router = Router::new();
        router
            .handle(
                "POST",
                "/echo",
                handle_fn(|req: RouteRequest| async move {
                    Response::new(Full::new(req.http.into_body()))
                }),
            )
            .await;

        Arc::new(DispatchContext {
            router,
            max_body_size: 16,
            server_name: "waypost-test".to_string(),
            access_log: false,
            access_log_format: "combined".to_string(),
            rate_limiter,
        })
    }

    fn post(body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_body_reaches_handler() {
        let ctx = context(None).await;
        let resp = handle_request(post("hello"), peer(), ctx).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[SERVER], "waypost-test");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let ctx = context(None).await;
        let resp = handle_request(post("this body is longer than sixteen bytes"), peer(), ctx)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_declared_length_over_limit_rejected() {
        let ctx = context(None).await;
        let req = Request::builder()
            .method("POST")
            .uri("/echo")
            .header(CONTENT_LENGTH, "1000")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = handle_request(req, peer(), ctx).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_rate_limited_client() {
        let ctx = context(Some(Arc::new(RateLimiter::new(1, 1)))).await;

        let first = handle_request(post("a"), peer(), Arc::clone(&ctx)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = handle_request(post("b"), peer(), ctx).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()[SERVER], "waypost-test");
    }
}
