//! HTTP Range request parsing module
//!
//! Range header parsing for partial content responses, compliant with RFC 7233.
//! Handles the `bytes` unit with one or more comma separated range specifiers.

use thiserror::Error;

/// One range specifier from a `Range: bytes=...` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `start-end`, both offsets inclusive
    Bounded { start: u64, end: u64 },
    /// `start-`, from start to the end of the content
    From { start: u64 },
    /// `-length`, the last `length` bytes of the content
    Suffix { length: u64 },
}

/// A range resolved against a known content length, offsets inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
}

/// Range header errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Header does not use the `bytes` unit; callers ignore the header
    #[error("unsupported range unit: {0}")]
    UnsupportedUnit(String),
    /// Syntax error inside a `bytes=` header; callers answer 400
    #[error("malformed range specifier: {0}")]
    Malformed(String),
    /// Range starts at or past the end of the content; callers answer 416
    #[error("range not satisfiable for content of {0} bytes")]
    Unsatisfiable(u64),
}

impl ByteRange {
    /// Resolve against the total content length
    ///
    /// An end offset past the content is clamped to the last byte. A start offset
    /// at or past the content length is not satisfiable.
    pub fn resolve(self, total: u64) -> Result<ResolvedRange, RangeError> {
        match self {
            Self::Bounded { start, end } => {
                if start >= total {
                    return Err(RangeError::Unsatisfiable(total));
                }
                let end = if end >= total { total - 1 } else { end };
                Ok(ResolvedRange { start, end })
            }
            Self::From { start } => {
                if start >= total {
                    return Err(RangeError::Unsatisfiable(total));
                }
                Ok(ResolvedRange {
                    start,
                    end: total - 1,
                })
            }
            Self::Suffix { length } => {
                if length == 0 || total == 0 {
                    return Err(RangeError::Unsatisfiable(total));
                }
                Ok(ResolvedRange {
                    start: total.saturating_sub(length),
                    end: total - 1,
                })
            }
        }
    }

    /// `Content-Range` value for this range, e.g. `bytes 400-499/500`
    pub fn content_range_value(self, total: u64) -> Result<String, RangeError> {
        Ok(self.resolve(total)?.content_range_value(total))
    }
}

impl ResolvedRange {
    /// Number of bytes covered by the range
    pub const fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn content_range_value(&self, total: u64) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// Parse an HTTP Range header value
///
/// Supported formats (comma separated, in any combination):
/// - `bytes=start-end` - Specific range
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes
///
/// The unit is matched case-insensitively. Ranges are returned in request order
/// without merging overlaps.
///
/// # Examples
/// ```
/// use waypost::http::range::{parse_range_header, ByteRange};
///
/// let ranges = parse_range_header("bytes=0-99,-100").unwrap();
/// assert_eq!(ranges[0], ByteRange::Bounded { start: 0, end: 99 });
/// assert_eq!(ranges[1], ByteRange::Suffix { length: 100 });
/// ```
pub fn parse_range_header(value: &str) -> Result<Vec<ByteRange>, RangeError> {
    let lowered = value.trim().to_ascii_lowercase();
    let Some(set) = lowered.strip_prefix("bytes=") else {
        return Err(RangeError::UnsupportedUnit(value.to_string()));
    };

    set.split(',').map(|spec| parse_range_spec(spec.trim())).collect()
}

/// Resolve every range of a request against the content length
///
/// Fails as a whole if any single range is not satisfiable.
pub fn resolve_ranges(ranges: &[ByteRange], total: u64) -> Result<Vec<ResolvedRange>, RangeError> {
    ranges.iter().map(|range| range.resolve(total)).collect()
}

/// Parse one specifier (e.g., "0-99", "100-" or "-500")
fn parse_range_spec(spec: &str) -> Result<ByteRange, RangeError> {
    let Some((start_str, end_str)) = spec.split_once('-') else {
        return Err(RangeError::Malformed(spec.to_string()));
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    match (start_str.is_empty(), end_str.is_empty()) {
        (true, true) => Err(RangeError::Malformed(spec.to_string())),
        (true, false) => Ok(ByteRange::Suffix {
            length: parse_offset(end_str, spec)?,
        }),
        (false, true) => Ok(ByteRange::From {
            start: parse_offset(start_str, spec)?,
        }),
        (false, false) => {
            let start = parse_offset(start_str, spec)?;
            let end = parse_offset(end_str, spec)?;
            if end < start {
                return Err(RangeError::Malformed(spec.to_string()));
            }
            Ok(ByteRange::Bounded { start, end })
        }
    }
}

fn parse_offset(digits: &str, spec: &str) -> Result<u64, RangeError> {
    // u64::from_str accepts a leading '+', which is not valid here
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::Malformed(spec.to_string()));
    }
    digits
        .parse::<u64>()
        .map_err(|_| RangeError::Malformed(spec.to_string()))
}
