//! HTTP response building module
//!
//! Provides builders for various HTTP status code responses, decoupled from specific business logic.

use crate::http::range::ResolvedRange;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

/// Headers shared by every response that carries file content
#[derive(Debug, Clone, Default)]
pub struct FileHeaders {
    pub content_type: String,
    pub last_modified: Option<String>,
    pub cache_control: Option<String>,
}

impl FileHeaders {
    fn apply(&self, mut builder: hyper::http::response::Builder) -> hyper::http::response::Builder {
        if let Some(ref last_modified) = self.last_modified {
            builder = builder.header("Last-Modified", last_modified.as_str());
        }
        if let Some(ref cache_control) = self.cache_control {
            builder = builder.header("Cache-Control", cache_control.as_str());
        }
        builder.header("Accept-Ranges", "bytes")
    }
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::BAD_REQUEST, "400 bad request")
}

/// Build 404 Not Found response, HTML when the client asked for it
pub fn build_404_response(html: bool) -> Response<Full<Bytes>> {
    if html {
        build_error_page(StatusCode::NOT_FOUND, "404 Not Found")
    } else {
        build_text_response(StatusCode::NOT_FOUND, "404 not found")
    }
}

/// Build 405 Method Not Allowed response, HTML when the client asked for it
pub fn build_405_response(html: bool) -> Response<Full<Bytes>> {
    if html {
        build_error_page(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed")
    } else {
        build_text_response(StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed")
    }
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 payload too large")
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Range", format!("bytes */{file_size}"))
        .body(Full::new(Bytes::from("416 range not satisfiable")))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(Full::new(Bytes::from("416 range not satisfiable")))
        })
}

/// Build 429 Too Many Requests response
pub fn build_429_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::TOO_MANY_REQUESTS, "429 too many requests")
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error")
}

/// Build generic HTML response
pub fn build_html_response(content: String, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build a whole-file response
///
/// `status` is 200 for a normal response and 204 when a conditional request
/// suppressed the body. `Content-Length` always announces the full file size.
pub fn build_file_response(
    status: StatusCode,
    headers: &FileHeaders,
    total_size: u64,
    body: Bytes,
) -> Response<Full<Bytes>> {
    headers
        .apply(Response::builder().status(status))
        .header("Content-Type", headers.content_type.as_str())
        .header("Content-Length", total_size)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 206 Partial Content response for a single range
pub fn build_partial_response(
    headers: &FileHeaders,
    range: ResolvedRange,
    total_size: u64,
    data: Bytes,
) -> Response<Full<Bytes>> {
    headers
        .apply(Response::builder().status(StatusCode::PARTIAL_CONTENT))
        .header("Content-Type", headers.content_type.as_str())
        .header("Content-Length", range.length())
        .header("Content-Range", range.content_range_value(total_size))
        .body(Full::new(data))
        .unwrap_or_else(|e| {
            log_build_error("206", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 206 Partial Content response carrying a `multipart/byteranges` body
pub fn build_multipart_response(
    headers: &FileHeaders,
    content_type: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    headers
        .apply(Response::builder().status(StatusCode::PARTIAL_CONTENT))
        .header("Content-Type", content_type)
        .header("Content-Length", body.len())
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("206 multipart", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

fn build_text_response(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(message)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::from(message)))
        })
}

fn build_error_page(status: StatusCode, title: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(format!(
            "<html><body><h1>{title}</h1></body></html>"
        ))))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    tracing::error!(status, %error, "Failed to build response");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(resp: &'a Response<Full<Bytes>>, name: &str) -> Option<&'a str> {
        resp.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_error_responses() {
        assert_eq!(build_400_response().status(), 400);
        assert_eq!(build_413_response().status(), 413);
        assert_eq!(build_429_response().status(), 429);
        assert_eq!(build_500_response().status(), 500);
    }

    #[test]
    fn test_not_found_variants() {
        let plain = build_404_response(false);
        assert_eq!(plain.status(), 404);
        assert_eq!(header(&plain, "Content-Type"), Some("text/plain; charset=utf-8"));

        let html = build_405_response(true);
        assert_eq!(html.status(), 405);
        assert_eq!(header(&html, "Content-Type"), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn test_416_reports_size() {
        let resp = build_416_response(500);
        assert_eq!(resp.status(), 416);
        assert_eq!(header(&resp, "Content-Range"), Some("bytes */500"));
    }

    #[test]
    fn test_partial_response_headers() {
        let headers = FileHeaders {
            content_type: "text/plain".to_string(),
            last_modified: Some("Mon, 02 Jan 2006 15:04:05 GMT".to_string()),
            cache_control: Some("max-age=60; public".to_string()),
        };
        let range = ResolvedRange { start: 10, end: 19 };
        let resp = build_partial_response(&headers, range, 100, Bytes::from_static(b"0123456789"));
        assert_eq!(resp.status(), 206);
        assert_eq!(header(&resp, "Content-Length"), Some("10"));
        assert_eq!(header(&resp, "Content-Range"), Some("bytes 10-19/100"));
        assert_eq!(header(&resp, "Accept-Ranges"), Some("bytes"));
        assert_eq!(header(&resp, "Cache-Control"), Some("max-age=60; public"));
        assert_eq!(
            header(&resp, "Last-Modified"),
            Some("Mon, 02 Jan 2006 15:04:05 GMT")
        );
    }

    #[test]
    fn test_file_response_without_cache_control() {
        let headers = FileHeaders {
            content_type: "image/png".to_string(),
            ..FileHeaders::default()
        };
        let resp = build_file_response(StatusCode::NO_CONTENT, &headers, 42, Bytes::new());
        assert_eq!(resp.status(), 204);
        assert_eq!(header(&resp, "Content-Length"), Some("42"));
        assert!(resp.headers().get("Cache-Control").is_none());
    }
}
