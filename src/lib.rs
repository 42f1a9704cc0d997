//! Throttled HTTP file transmission
//!
//! Serves files with strong validators, `If-None-Match`, single byte ranges
//! and chunk pacing. [`transfer::FileSender`] is the engine; the `server` and
//! `handler` modules host it behind hyper.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod transfer;

pub use error::SendError;
pub use transfer::{FileSender, RequestConditions, SendOptions, ThrottlePolicy};
