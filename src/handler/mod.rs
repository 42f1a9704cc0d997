//! Request handler module
//!
//! Routes requests to configured files and directories and hands them to the
//! throttled file sender.

pub mod files;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
