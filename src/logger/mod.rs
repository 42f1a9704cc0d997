//! Logger module
//!
//! Provides logging utilities for the file server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Transfer progress and error logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::LogLevel;

use crate::config::Config;
use crate::http::ByteInterval;
use crate::transfer::{TransferOutcome, TransferReport};
use std::net::SocketAddr;
use std::path::Path;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    let level = config.logging.level.parse().unwrap_or_else(|e| {
        eprintln!("[WARN] {e}, using info");
        LogLevel::Info
    });
    writer::init(
        level,
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write a line, falling back to stdout/stderr before `init`
fn write(level: LogLevel, message: &str) {
    match writer::get() {
        Some(w) => w.write(level, message),
        None if level <= LogLevel::Warn => eprintln!("{message}"),
        None if level == LogLevel::Info => println!("{message}"),
        None => {}
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write(LogLevel::Info, "======================================");
    write(LogLevel::Info, "Throttled file server started");
    write(LogLevel::Info, &format!("Listening on: http://{addr}"));
    write(LogLevel::Info, &format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write(LogLevel::Info, &format!("Worker threads: {workers}"));
    }
    write(
        LogLevel::Info,
        &format!(
            "Default throttle: {} bytes every {}s",
            config.transfer.chunk_bytes, config.transfer.delay_secs
        ),
    );
    write(LogLevel::Info, &format!("Routes: {}", config.routes.len()));
    write(LogLevel::Info, "======================================\n");
}

pub fn log_shutdown(active: usize) {
    write(
        LogLevel::Info,
        &format!("[Shutdown] No longer accepting connections ({active} still active)"),
    );
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write(LogLevel::Debug, &format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write(LogLevel::Error, &format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write(LogLevel::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write(LogLevel::Warn, &format!("[WARN] {message}"));
}

pub fn log_debug(message: &str) {
    write(LogLevel::Debug, &format!("[DEBUG] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    match writer::get() {
        Some(w) => w.write_access(&entry.format(format)),
        None => println!("{}", entry.format(format)),
    }
}

pub fn log_transfer_started(path: &Path, interval: ByteInterval, size: u64) {
    write(
        LogLevel::Debug,
        &format!(
            "[Transfer] {} bytes {interval}/{size} ({} bytes)",
            path.display(),
            interval.len()
        ),
    );
}

pub fn log_transfer_finished(path: &Path, interval: ByteInterval, report: &TransferReport) {
    let message = format!(
        "[Transfer] {} bytes {interval}: {} bytes in {} chunks",
        path.display(),
        report.bytes_sent,
        report.chunks
    );
    match report.outcome {
        TransferOutcome::Completed => write(LogLevel::Debug, &format!("{message}, completed")),
        TransferOutcome::EndOfFile => {
            write(LogLevel::Warn, &format!("[WARN] {message}, file ended early"));
        }
        TransferOutcome::Disconnected => {
            write(LogLevel::Info, &format!("{message}, client disconnected"));
        }
    }
}

pub fn log_not_modified(path: &Path) {
    write(LogLevel::Debug, &format!("[Cache] {} not modified", path.display()));
}

pub fn log_range_not_satisfiable(path: &Path, range: Option<&str>, size: u64) {
    write(
        LogLevel::Info,
        &format!(
            "[Range] {} '{}' not satisfiable for {size} bytes",
            path.display(),
            range.unwrap_or("-")
        ),
    );
}

pub fn log_transfer_failed(path: &Path, err: &crate::error::SendError) {
    write(
        LogLevel::Error,
        &format!("[ERROR] Transfer of {} aborted: {err}", path.display()),
    );
}
