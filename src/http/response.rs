//! HTTP response building module
//!
//! The framing functions build an ordered [`ResponseHead`] without doing any
//! I/O; the host turns it into a hyper response. The remaining builders cover
//! the plain status responses of the server.

use hyper::header::{
    HeaderName, ACCEPT_RANGES, ALLOW, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, ETAG, EXPIRES, LAST_MODIFIED, PRAGMA,
};
use hyper::{Response, StatusCode};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::body::{self, ResponseBody};
use super::cache::Validator;
use super::range::ByteInterval;

/// Characters kept as-is in a disposition filename (RFC 3986 unreserved)
const FILENAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const CACHE_CONTROL_VALUE: &str = "must-revalidate, private";
const PRAGMA_VALUE: &str = "private";

/// Status line and ordered headers of a response, before any byte is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, String)>,
}

impl ResponseHead {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::with_capacity(12),
        }
    }

    fn push(&mut self, name: HeaderName, value: impl Into<String>) {
        self.headers.push((name, value.into()));
    }

    /// First value of a header, if present
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Declared `Content-Length`, if any
    pub fn content_length(&self) -> Option<u64> {
        self.header(&CONTENT_LENGTH)?.parse().ok()
    }

    /// Attach a body and build the hyper response
    pub fn into_response(self, content: ResponseBody) -> Response<ResponseBody> {
        let status = self.status;
        let mut builder = Response::builder().status(status);
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        builder.body(content).unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            build_500_response()
        })
    }
}

/// Representation headers chosen by the caller for a 200/206
#[derive(Debug, Clone)]
pub struct EntityHeaders<'a> {
    /// Suggested filename, `None` suppresses `Content-Disposition`
    pub disposition: Option<&'a str>,
    pub content_type: &'a str,
    /// Ready-made `Expires` value
    pub expires: String,
}

/// Headers common to every outcome: `ETag` then `Last-Modified`
fn with_validator(status: StatusCode, validator: &Validator) -> ResponseHead {
    let mut head = ResponseHead::new(status);
    head.push(ETAG, validator.etag_header());
    head.push(LAST_MODIFIED, validator.last_modified_header());
    head
}

/// 304 Not Modified: validator headers only
pub fn frame_not_modified(validator: &Validator) -> ResponseHead {
    with_validator(StatusCode::NOT_MODIFIED, validator)
}

/// 416 Range Not Satisfiable
pub fn frame_not_satisfiable(validator: &Validator, size: u64) -> ResponseHead {
    let mut head = with_validator(StatusCode::RANGE_NOT_SATISFIABLE, validator);
    head.push(CONTENT_RANGE, format!("bytes */{size}"));
    head.push(CONTENT_LENGTH, "0");
    head
}

/// 200 for the whole resource (`range == None`) or 206 for one interval
pub fn frame_content(
    validator: &Validator,
    entity: &EntityHeaders<'_>,
    size: u64,
    range: Option<ByteInterval>,
) -> ResponseHead {
    let status = if range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let mut head = with_validator(status, validator);

    if let Some(filename) = entity.disposition.filter(|f| !f.is_empty()) {
        head.push(CONTENT_DISPOSITION, content_disposition(filename));
    }
    head.push(CONTENT_TYPE, entity.content_type);
    head.push(ACCEPT_RANGES, "bytes");
    head.push(CACHE_CONTROL, CACHE_CONTROL_VALUE);
    head.push(PRAGMA, PRAGMA_VALUE);
    head.push(EXPIRES, entity.expires.clone());

    match range {
        Some(interval) => {
            head.push(CONTENT_LENGTH, interval.len().to_string());
            head.push(CONTENT_RANGE, interval.content_range(size));
        }
        None => head.push(CONTENT_LENGTH, size.to_string()),
    }
    head
}

/// `Content-Disposition` value with a percent-encoded filename
///
/// # Examples
/// ```
/// use sendfile::http::response::content_disposition;
/// assert_eq!(
///     content_disposition("my report.pdf"),
///     "attachment; filename=\"my%20report.pdf\""
/// );
/// ```
pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"",
        utf8_percent_encode(filename, FILENAME_ESCAPE)
    )
}

/// Build 403 Forbidden response
pub fn build_403_response() -> Response<ResponseBody> {
    plain_response(StatusCode::FORBIDDEN, "403 Forbidden")
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    plain_response(StatusCode::NOT_FOUND, "404 Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(CONTENT_TYPE, "text/plain")
        .header(ALLOW, "GET, HEAD, OPTIONS")
        .body(body::full("405 Method Not Allowed"))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(body::empty())
        })
}

/// Build OPTIONS response
pub fn build_options_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, "GET, HEAD, OPTIONS")
        .header(ACCEPT_RANGES, "bytes")
        .body(body::empty())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(body::empty())
        })
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ResponseBody> {
    plain_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
}

fn plain_response(status: StatusCode, text: &'static str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain")
        .header(CONTENT_LENGTH, text.len())
        .body(body::full(text))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(body::empty())
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
