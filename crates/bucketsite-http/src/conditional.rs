//! Byte ranges, validators and HTTP dates.
//!
//! Helpers for the parts of a `GET` that depend on request headers:
//! `Range`/`If-Range` for partial content and `If-None-Match`/
//! `If-Modified-Since` for `304 Not Modified`.

use chrono::{DateTime, NaiveDateTime, Utc};
use http::HeaderMap;
use http::header;

/// Format used for `Last-Modified` and friends (IMF-fixdate).
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Obsolete formats still accepted on input.
const OBSOLETE_DATE_FORMATS: [&str; 2] = [
    // RFC 850
    "%A, %d-%b-%y %H:%M:%S GMT",
    // asctime
    "%a %b %e %H:%M:%S %Y",
];

/// An inclusive byte range within an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always `false`; a range covers at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` value for an object of `size` bytes.
    #[must_use]
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

/// How a `Range` header applies to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// Serve the whole object.
    Full,
    /// Serve one range with `206 Partial Content`.
    Partial(ByteRange),
    /// Answer `416 Range Not Satisfiable`.
    Unsatisfiable,
}

/// Evaluate a `Range` header against an object of `size` bytes.
///
/// A missing header and multi-range requests yield [`RangeRequest::Full`].
/// Malformed specs and ranges starting past the end are unsatisfiable.
/// Ends past the last byte are clamped, as are suffixes longer than the object.
///
/// # Examples
///
/// ```
/// use bucketsite_http::conditional::{ByteRange, RangeRequest, parse_range};
///
/// assert_eq!(parse_range(Some("bytes=0-4"), 10), RangeRequest::Partial(ByteRange { start: 0, end: 4 }));
/// assert_eq!(parse_range(Some("bytes=-3"), 10), RangeRequest::Partial(ByteRange { start: 7, end: 9 }));
/// assert_eq!(parse_range(Some("bytes=5-"), 10), RangeRequest::Partial(ByteRange { start: 5, end: 9 }));
/// assert_eq!(parse_range(Some("bytes=10-"), 10), RangeRequest::Unsatisfiable);
/// assert_eq!(parse_range(None, 10), RangeRequest::Full);
/// ```
#[must_use]
pub fn parse_range(header: Option<&str>, size: u64) -> RangeRequest {
    let Some(header) = header else {
        return RangeRequest::Full;
    };
    let Some(ranges) = header.trim().strip_prefix("bytes=") else {
        return RangeRequest::Unsatisfiable;
    };
    if ranges.contains(',') {
        return RangeRequest::Full;
    }

    let Some((first, last)) = ranges.trim().split_once('-') else {
        return RangeRequest::Unsatisfiable;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // bytes=-N  (last N bytes)
        let Ok(n) = last.parse::<u64>() else {
            return RangeRequest::Unsatisfiable;
        };
        if n == 0 || size == 0 {
            return RangeRequest::Unsatisfiable;
        }
        return RangeRequest::Partial(ByteRange {
            start: size - n.min(size),
            end: size - 1,
        });
    }

    let Ok(start) = first.parse::<u64>() else {
        return RangeRequest::Unsatisfiable;
    };
    if start >= size {
        return RangeRequest::Unsatisfiable;
    }

    let end = if last.is_empty() {
        // bytes=N-  (from N to end)
        size - 1
    } else {
        // bytes=N-M
        match last.parse::<u64>() {
            Ok(end) if end >= start => end.min(size - 1),
            _ => return RangeRequest::Unsatisfiable,
        }
    };

    RangeRequest::Partial(ByteRange { start, end })
}

/// Strip the weak prefix and surrounding quotes from an entity tag.
fn normalize_etag(etag: &str) -> &str {
    let etag = etag.trim();
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    etag.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(etag)
}

/// Whether an `If-None-Match` list matches `etag` (weak comparison).
///
/// # Examples
///
/// ```
/// use bucketsite_http::conditional::if_none_match_matches;
///
/// assert!(if_none_match_matches("\"abc\"", "*"));
/// assert!(if_none_match_matches("\"abc\"", "\"xyz\", W/\"abc\""));
/// assert!(!if_none_match_matches("\"abc\"", "\"xyz\""));
/// ```
#[must_use]
pub fn if_none_match_matches(etag: &str, if_none_match: &str) -> bool {
    if if_none_match.trim() == "*" {
        return true;
    }
    let etag = normalize_etag(etag);
    if_none_match
        .split(',')
        .any(|candidate| normalize_etag(candidate) == etag)
}

/// Whether a `GET`/`HEAD` should be answered with `304 Not Modified`.
///
/// `If-None-Match` takes precedence; `If-Modified-Since` is only consulted
/// when it is absent and the modification time is known.
#[must_use]
pub fn is_not_modified(
    headers: &HeaderMap,
    etag: Option<&str>,
    modified: Option<DateTime<Utc>>,
) -> bool {
    if let Some(inm) = header_str(headers, header::IF_NONE_MATCH) {
        return etag.is_some_and(|etag| if_none_match_matches(etag, inm));
    }

    let since = header_str(headers, header::IF_MODIFIED_SINCE).and_then(parse_http_date);
    match (since, modified) {
        (Some(since), Some(modified)) => modified.timestamp() <= since.timestamp(),
        _ => false,
    }
}

/// Whether the `Range` header should be honored given `If-Range`.
///
/// An `If-Range` validator that is neither the current strong entity tag
/// nor the exact modification date turns the request into a full `GET`.
#[must_use]
pub fn range_applies(headers: &HeaderMap, etag: Option<&str>, modified: Option<DateTime<Utc>>) -> bool {
    let Some(validator) = header_str(headers, header::IF_RANGE) else {
        return true;
    };
    let validator = validator.trim();

    if validator.starts_with('"') {
        return etag.is_some_and(|etag| !etag.starts_with("W/") && etag.trim() == validator);
    }

    match (parse_http_date(validator), modified) {
        (Some(date), Some(modified)) => modified.timestamp() == date.timestamp(),
        _ => false,
    }
}

/// Format a timestamp as an HTTP date.
///
/// # Examples
///
/// ```
/// use bucketsite_http::conditional::format_http_date;
///
/// let dt = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
/// assert_eq!(format_http_date(&dt), "Tue, 14 Nov 2023 22:13:20 GMT");
/// ```
#[must_use]
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date in any of the formats clients send.
#[must_use]
pub fn parse_http_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, HTTP_DATE_FORMAT) {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    OBSOLETE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
