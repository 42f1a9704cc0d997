//! HTTP Range request parsing module
//!
//! Single-range `bytes=start-end` parsing for partial downloads.
//! Only the first range of a multi-range request is honored.

use std::fmt;

/// Inclusive byte interval within a resource
///
/// Always satisfies `start <= end < size` for the size it was built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteInterval {
    start: u64,
    end: u64,
}

impl ByteInterval {
    /// Build an interval, returns `None` unless `start <= end < size`
    pub const fn new(start: u64, end: u64, size: u64) -> Option<Self> {
        if start <= end && end < size {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Interval covering the whole resource, `None` for an empty one
    pub const fn full(size: u64) -> Option<Self> {
        if size == 0 {
            None
        } else {
            Some(Self {
                start: 0,
                end: size - 1,
            })
        }
    }

    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered, equals the transmitted `Content-Length`
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Intervals are never empty
    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value, e.g. `bytes 100-199/1000`
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

impl fmt::Display for ByteInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Range header parse result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No Range header, send the whole resource with a 200
    Full,
    /// Range request, send the interval with a 206
    Partial(ByteInterval),
    /// Start beyond the resource or after the end - should return 416
    NotSatisfiable,
}

/// Parse HTTP Range header
///
/// Parsing is lenient:
/// - The unit before `=` is not checked
/// - Only the first comma-separated range is used
/// - Missing or non-numeric start means 0
/// - Missing, empty or non-numeric end means the last byte
/// - An end past the last byte is clamped to it
///
/// A start at or past `file_size`, or after the end, is not satisfiable.
///
/// # Examples
/// ```
/// use sendfile::http::range::{parse_range_header, RangeOutcome};
///
/// let outcome = parse_range_header(Some("bytes=100-199"), 1000);
/// let RangeOutcome::Partial(interval) = outcome else { panic!() };
/// assert_eq!(interval.len(), 100);
///
/// assert_eq!(parse_range_header(None, 1000), RangeOutcome::Full);
/// ```
pub fn parse_range_header(range_header: Option<&str>, file_size: u64) -> RangeOutcome {
    let Some(header) = range_header else {
        return RangeOutcome::Full;
    };

    let spec = header.split_once('=').map_or(header, |(_, spec)| spec);
    let first = spec.split(',').next().unwrap_or_default();
    let (start_str, end_str) = first.split_once('-').unwrap_or((first, ""));

    let Some(last_byte) = file_size.checked_sub(1) else {
        return RangeOutcome::NotSatisfiable;
    };

    let start = leading_integer(start_str).unwrap_or(0);
    let end = leading_integer(end_str).map_or(last_byte, |e| e.min(last_byte));

    ByteInterval::new(start, end, file_size)
        .map_or(RangeOutcome::NotSatisfiable, RangeOutcome::Partial)
}

/// Read the leading decimal digits of a value, ignoring what follows
///
/// `" 12abc"` reads as 12, `"abc"` and `""` read as `None`. Values too large
/// for `u64` saturate.
fn leading_integer(value: &str) -> Option<u64> {
    let digits: &str = {
        let trimmed = value.trim_start();
        let len = trimmed
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        &trimmed[..len]
    };

    if digits.is_empty() {
        return None;
    }

    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}
