// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub transfer: TransferConfig,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub max_connections: Option<u64>,
    /// Seconds to wait for open connections after a shutdown signal
    pub shutdown_timeout: u64,
}

/// Transfer defaults shared by every route
#[derive(Debug, Deserialize, Clone)]
pub struct TransferConfig {
    pub chunk_bytes: usize,
    pub delay_secs: f64,
    #[serde(default)]
    pub expires_secs: Option<i64>,
    #[serde(default)]
    pub content_type: Option<String>,
    pub with_disposition: bool,
}

/// What a route serves
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// One file, at exactly the route URL
    File,
    /// Files below a directory, for URLs under the route prefix
    Dir,
}

/// A served URL and its per-route transfer overrides
#[derive(Debug, Deserialize, Clone)]
pub struct RouteConfig {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: RouteKind,
    /// File or directory on disk
    pub path: String,
    #[serde(default)]
    pub disposition: Option<String>,
    #[serde(default)]
    pub with_disposition: Option<bool>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub chunk_bytes: Option<usize>,
    #[serde(default)]
    pub delay_secs: Option<f64>,
    #[serde(default)]
    pub expires_secs: Option<i64>,
}
