//! HTTP cache control module
//!
//! Provides HTTP date handling, `Cache-Control` values and conditional request checks.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::{Duration, SystemTime};

/// Layout of `Last-Modified` and `If-Modified-Since` values
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an HTTP date, e.g. `Mon, 02 Jan 2006 15:04:05 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format(HTTP_DATE_FORMAT)
        .to_string()
}

/// Parse an HTTP date, returns None for anything not in the expected layout
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Build the `Cache-Control` value for static content
///
/// Returns None when `max_age` is zero, meaning the header is omitted.
pub fn cache_control_value(max_age: Duration) -> Option<String> {
    let seconds = max_age.as_secs();
    (seconds > 0).then(|| format!("max-age={seconds}; public"))
}

/// Check a client's `If-Modified-Since` header against a file modification time
///
/// Returns true (body should be suppressed) only when the header parses and the
/// modification time, truncated to whole seconds, is not after it. Unparseable
/// headers are ignored.
pub fn is_not_modified(if_modified_since: Option<&str>, modified: Option<SystemTime>) -> bool {
    let (Some(header), Some(modified)) = (if_modified_since, modified) else {
        return false;
    };
    let Some(since) = parse_http_date(header) else {
        return false;
    };
    DateTime::<Utc>::from(modified).timestamp() <= since.timestamp()
}
