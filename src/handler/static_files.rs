//! Static file serving module
//!
//! Serves a local directory tree behind a `<prefix>/*path` route: index files,
//! directory listings, conditional GET and single or multi range requests.

use crate::handler::dir_index;
use crate::http::cache::{self, cache_control_value, format_http_date};
use crate::http::multipart::{self, ByteRangesWriter};
use crate::http::range::{self, RangeError, ResolvedRange};
use crate::http::response::{
    build_400_response, build_416_response, build_500_response, build_file_response,
    build_html_response, build_multipart_response, build_partial_response, FileHeaders,
};
use crate::http::{ExtensionMimeResolver, MimeResolver};
use crate::routing::{
    handle_fn, Fallbacks, Handle, HttpRequest, HttpResponse, Request, STATIC_PATH_PARAMETER,
};
use hyper::body::Bytes;
use percent_encoding::percent_decode_str;
use hyper::header::{IF_MODIFIED_SINCE, RANGE};
use hyper::{Method, StatusCode};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, error, info, warn};

/// Most parts a multi-range response may carry
const MAX_RANGES: usize = 32;

/// Settings for a static file mount
#[derive(Clone)]
pub struct StaticOptions {
    /// File served for directory requests, `index.html` by default
    pub index_file: String,
    /// Render an HTML listing for directories without an index file
    pub directory_listing: bool,
    /// `Cache-Control` max-age; zero omits the header
    pub cache_max_age: Duration,
    pub mime: Arc<dyn MimeResolver>,
}

impl Default for StaticOptions {
    fn default() -> Self {
        Self {
            index_file: "index.html".to_string(),
            directory_listing: true,
            cache_max_age: Duration::from_secs(24 * 60 * 60),
            mime: Arc::new(ExtensionMimeResolver),
        }
    }
}

/// Static file engine bound to one local root
pub struct StaticFiles {
    root: PathBuf,
    url_prefix: String,
    options: StaticOptions,
    fallbacks: Arc<Fallbacks>,
}

impl StaticFiles {
    /// `url_prefix` is the route prefix including its trailing `/`
    pub fn new(
        root: PathBuf,
        url_prefix: String,
        options: StaticOptions,
        fallbacks: Arc<Fallbacks>,
    ) -> Self {
        Self {
            root,
            url_prefix,
            options,
            fallbacks,
        }
    }

    pub fn into_handle(self: Arc<Self>) -> Handle {
        handle_fn(move |req| {
            let engine = Arc::clone(&self);
            async move { engine.serve(req).await }
        })
    }

    /// Serve the file or directory named by the request's wildcard parameter
    pub async fn serve(&self, req: Request) -> HttpResponse {
        let http = &req.http;
        let raw = req.param(STATIC_PATH_PARAMETER).unwrap_or_default();
        let relative = match percent_decode_str(raw).decode_utf8() {
            Ok(decoded) => strip_traversal(&decoded),
            Err(_) => {
                warn!(path = raw, "Request path is not valid UTF-8 once decoded");
                return build_400_response();
            }
        };
        let is_head = http.method() == Method::HEAD;
        let target = self.root.join(relative.trim_start_matches('/'));

        let is_directory = relative.is_empty()
            || relative.ends_with('/')
            || fs::metadata(&target).await.is_ok_and(|m| m.is_dir());
        if !is_directory {
            return self.serve_file(http, &target, is_head).await;
        }

        let index = target.join(&self.options.index_file);
        if fs::metadata(&index).await.is_ok_and(|m| m.is_file()) {
            return self.serve_file(http, &index, is_head).await;
        }
        if self.options.directory_listing && fs::metadata(&target).await.is_ok_and(|m| m.is_dir()) {
            return self.serve_listing(http, &target, &relative, is_head).await;
        }
        self.fallbacks.not_found(http)
    }

    async fn serve_file(&self, req: &HttpRequest, path: &Path, is_head: bool) -> HttpResponse {
        if !self.is_contained(path).await {
            return self.fallbacks.not_found(req);
        }

        let mut file = match File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                info!(path = %path.display(), error = %e, "Static file not found");
                return self.fallbacks.not_found(req);
            }
        };
        let metadata = match file.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return self.fallbacks.not_found(req),
        };

        let total = metadata.len();
        let modified = metadata.modified().ok();
        let headers = FileHeaders {
            content_type: self.options.mime.content_type(path),
            last_modified: modified.map(format_http_date),
            cache_control: cache_control_value(self.options.cache_max_age),
        };

        if cache::is_not_modified(header_str(req, IF_MODIFIED_SINCE), modified) {
            return build_file_response(StatusCode::NO_CONTENT, &headers, total, Bytes::new());
        }
        if is_head {
            return build_file_response(StatusCode::OK, &headers, total, Bytes::new());
        }

        if let Some(value) = header_str(req, RANGE) {
            match range::parse_range_header(value) {
                Ok(ranges) => match range::resolve_ranges(&ranges, total) {
                    Ok(resolved) if within_range_budget(&resolved, total) => {
                        return serve_ranges(&mut file, path, &headers, &resolved, total).await;
                    }
                    Ok(_) => debug!(range = value, "Range set too large, serving whole file"),
                    Err(_) => return build_416_response(total),
                },
                Err(RangeError::UnsupportedUnit(_)) => {}
                Err(e) => {
                    warn!(range = value, error = %e, "Rejected range header");
                    return build_400_response();
                }
            }
        }

        match read_all(&mut file, total).await {
            Ok(data) => {
                let length = u64::try_from(data.len()).unwrap_or(total);
                build_file_response(StatusCode::OK, &headers, length, data)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read static file");
                build_500_response()
            }
        }
    }

    async fn serve_listing(
        &self,
        req: &HttpRequest,
        dir: &Path,
        relative: &str,
        is_head: bool,
    ) -> HttpResponse {
        if !self.is_contained(dir).await {
            return self.fallbacks.not_found(req);
        }

        let mut directory_url = format!("{}{}", self.url_prefix, relative.trim_start_matches('/'));
        if !directory_url.ends_with('/') {
            directory_url.push('/');
        }

        match dir_index::read_listing(dir).await {
            Ok(listing) => build_html_response(dir_index::render(&directory_url, &listing), is_head),
            Err(e) => {
                error!(path = %dir.display(), error = %e, "Failed to read directory");
                build_500_response()
            }
        }
    }

    /// Both paths are canonicalized, so symlinks and leftover `..` components
    /// cannot escape the root
    async fn is_contained(&self, path: &Path) -> bool {
        let root = match fs::canonicalize(&self.root).await {
            Ok(root) => root,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Static root not found or inaccessible");
                return false;
            }
        };
        // Missing files are common (404), no need to log
        let Ok(resolved) = fs::canonicalize(path).await else {
            return false;
        };
        if resolved.starts_with(&root) {
            return true;
        }
        warn!(
            path = %path.display(),
            resolved = %resolved.display(),
            "Path traversal attempt blocked"
        );
        false
    }
}

/// A range set is only honoured when it has at most [`MAX_RANGES`] parts and
/// does not add up to more than the file itself
fn within_range_budget(ranges: &[ResolvedRange], total: u64) -> bool {
    let requested = ranges
        .iter()
        .try_fold(0u64, |sum, range| sum.checked_add(range.length()));
    ranges.len() <= MAX_RANGES && requested.is_some_and(|sum| sum <= total)
}

async fn serve_ranges(
    file: &mut File,
    path: &Path,
    headers: &FileHeaders,
    ranges: &[ResolvedRange],
    total: u64,
) -> HttpResponse {
    let result = if let [single] = ranges {
        read_range(file, *single)
            .await
            .map(|data| build_partial_response(headers, *single, total, data))
    } else {
        read_multipart(file, headers, ranges, total).await
    };

    result.unwrap_or_else(|e| {
        error!(path = %path.display(), error = %e, "Failed to read file range");
        build_500_response()
    })
}

async fn read_multipart(
    file: &mut File,
    headers: &FileHeaders,
    ranges: &[ResolvedRange],
    total: u64,
) -> io::Result<HttpResponse> {
    let mut writer = ByteRangesWriter::new(multipart::generate_boundary());
    for range in ranges {
        let data = read_range(file, *range).await?;
        writer.add_part(&headers.content_type, &range.content_range_value(total), &data);
    }
    let content_type = multipart::content_type(writer.boundary());
    Ok(build_multipart_response(headers, &content_type, writer.finish()))
}

async fn read_range(file: &mut File, range: ResolvedRange) -> io::Result<Bytes> {
    let length = usize::try_from(range.length())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "range too large"))?;
    file.seek(SeekFrom::Start(range.start)).await?;
    let mut buf = vec![0; length];
    file.read_exact(&mut buf).await?;
    Ok(Bytes::from(buf))
}

async fn read_all(file: &mut File, size_hint: u64) -> io::Result<Bytes> {
    let mut buf = Vec::with_capacity(usize::try_from(size_hint).unwrap_or_default());
    file.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

fn header_str(req: &HttpRequest, name: hyper::header::HeaderName) -> Option<&str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Remove every `../` from a request path
fn strip_traversal(path: &str) -> String {
    let mut cleaned = path.to_string();
    while cleaned.contains("../") {
        cleaned = cleaned.replace("../", "");
    }
    cleaned
}
