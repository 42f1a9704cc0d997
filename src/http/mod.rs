//! HTTP protocol layer module
//!
//! Validators, conditional requests, Range parsing, MIME detection and response
//! framing. Nothing here performs I/O; the transfer and handler layers do.

pub mod body;
pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::ResponseBody;
pub use cache::{check_etag_match, generate_validator, Validator};
pub use range::{parse_range_header, ByteInterval, RangeOutcome};
pub use response::{
    build_403_response, build_404_response, build_405_response, build_500_response,
    build_options_response, ResponseHead,
};
