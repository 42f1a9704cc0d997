//! HTTP cache control module
//!
//! Provides validator (`ETag` + `Last-Modified`) generation and conditional request handling.

use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Utc};

/// Format used for `Last-Modified` and `Expires` (RFC 1123, always GMT)
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Fixed expiry in the past, forces clients to revalidate every time
pub const EXPIRES_IN_THE_PAST: &str = "Mon, 26 Jul 1997 05:00:00 GMT";

/// Latest date an HTTP-date can carry
pub const EXPIRES_LAST_DATE: &str = "Fri, 31 Dec 9999 23:59:59 GMT";

/// Suffix some compressing intermediaries append to a strong tag
const ENCODING_SUFFIX: &str = "-gzip";

/// Strong validator of one file representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    /// Unquoted hex digest
    pub etag: String,
    /// Modification time, truncated to whole seconds
    pub last_modified: DateTime<Utc>,
}

impl Validator {
    /// Quoted form used in the `ETag` header, e.g. `"5d41402abc4b2a76"`
    pub fn etag_header(&self) -> String {
        format!("\"{}\"", self.etag)
    }

    /// RFC 1123 form used in the `Last-Modified` header
    pub fn last_modified_header(&self) -> String {
        format_http_date(&self.last_modified)
    }
}

/// Generate the validator of a file from its identity, size and modification time
///
/// The tag is the MD5 digest of the three values concatenated, so any change
/// to content length, timestamp or path yields a different tag. It does not
/// depend on process state and stays stable across restarts.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use sendfile::http::cache::generate_validator;
///
/// let mtime = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// let a = generate_validator("files/a.bin", 1000, mtime);
/// let b = generate_validator("files/a.bin", 1001, mtime);
/// assert_ne!(a.etag, b.etag);
/// ```
pub fn generate_validator(identity: &str, size: u64, modified: DateTime<Utc>) -> Validator {
    let secs = modified.timestamp();
    let digest = md5::compute(format!("{identity}{size}{secs}"));
    let last_modified = Utc
        .timestamp_opt(secs, 0)
        .single()
        .unwrap_or(modified);

    Validator {
        etag: format!("{digest:x}"),
        last_modified,
    }
}

/// Check if client's `If-None-Match` header matches the server's validator
///
/// The client value is compared as one opaque tag:
/// - Surrounding `"` characters are trimmed
/// - A trailing `-gzip` marker is stripped (added by compressing proxies)
/// - Lists (`"a", "b"`) and `*` are not interpreted
///
/// # Returns
/// Returns true if matched (should return 304), false otherwise
pub fn check_etag_match(if_none_match: Option<&str>, validator: &Validator) -> bool {
    if_none_match.is_some_and(|client_etag| {
        let client = client_etag.trim_matches('"');
        let client = client.strip_suffix(ENCODING_SUFFIX).unwrap_or(client);
        client == validator.etag.trim()
    })
}

/// Format a timestamp as an HTTP date
pub fn format_http_date(time: &DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// Value of the `Expires` header
///
/// `None` yields a fixed date in the past; otherwise `now + seconds`.
/// Windows running past year 9999 are clamped to [`EXPIRES_LAST_DATE`],
/// windows running before the epoch use [`EXPIRES_IN_THE_PAST`].
pub fn expires_header(window_secs: Option<i64>, now: DateTime<Utc>) -> String {
    let Some(secs) = window_secs else {
        return EXPIRES_IN_THE_PAST.to_string();
    };
    let expires = TimeDelta::try_seconds(secs).and_then(|d| now.checked_add_signed(d));
    match expires {
        Some(at) if at.year() > 9999 => EXPIRES_LAST_DATE.to_string(),
        Some(at) if at.timestamp() >= 0 => format_http_date(&at),
        Some(_) => EXPIRES_IN_THE_PAST.to_string(),
        None if secs > 0 => EXPIRES_LAST_DATE.to_string(),
        None => EXPIRES_IN_THE_PAST.to_string(),
    }
}
