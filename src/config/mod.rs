// Configuration module entry point
// Loads the server configuration and builds per-route transfer options

mod state;
mod types;

use std::net::SocketAddr;
use std::str::FromStr;

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File, FileFormat};

use crate::transfer::{SendOptions, ThrottleError, ThrottlePolicy};

// Re-export public types
pub use state::{AppState, ResolvedRoute};
pub use types::{
    Config, LoggingConfig, PerformanceConfig, RouteConfig, RouteKind, ServerConfig,
    TransferConfig,
};

/// Default config file, looked up without extension
pub const DEFAULT_CONFIG_PATH: &str = "sendfile";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Missing files are fine: defaults and `SENDFILE__*` environment
    /// variables still apply.
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix("SENDFILE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.shutdown_timeout", 30)?
            .set_default(
                "transfer.chunk_bytes",
                u64::try_from(ThrottlePolicy::DEFAULT_CHUNK_BYTES).unwrap_or(u64::MAX),
            )?
            .set_default("transfer.delay_secs", ThrottlePolicy::DEFAULT_DELAY_SECS)?
            .set_default("transfer.with_disposition", true)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Transfer defaults merged with a route's overrides
    pub fn transfer_options(&self, route: &RouteConfig) -> Result<SendOptions, ThrottleError> {
        let defaults = &self.transfer;
        let throttle = ThrottlePolicy::new(
            route.chunk_bytes.unwrap_or(defaults.chunk_bytes),
            route.delay_secs.unwrap_or(defaults.delay_secs),
        )?;

        let mut options = SendOptions::default().with_throttle(throttle);
        options.with_disposition = route.with_disposition.unwrap_or(defaults.with_disposition);
        options.disposition.clone_from(&route.disposition);
        options.content_type = route
            .content_type
            .clone()
            .or_else(|| defaults.content_type.clone());
        options.expires_secs = route.expires_secs.or(defaults.expires_secs);
        Ok(options)
    }
}

/// Parse a TOML document on top of the defaults, without environment overrides
impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(toml: &str) -> Result<Self, Self::Err> {
        Self::builder()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(toml: &str) -> Config {
        toml.parse().unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse("");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.access_log_format, "combined");
        assert_eq!(config.transfer.chunk_bytes, 40_960);
        assert!((config.transfer.delay_secs - 0.1).abs() < f64::EPSILON);
        assert!(config.transfer.with_disposition);
        assert_eq!(config.performance.shutdown_timeout, 30);
        assert!(config.routes.is_empty());
        assert_eq!(
            config.get_socket_addr().unwrap(),
            "127.0.0.1:8080".parse().unwrap()
        );
    }

    #[test]
    fn test_routes() {
        let config = parse(
            r#"
            [[routes]]
            url = "/download"
            type = "file"
            path = "./data/report.pdf"
            disposition = "Quarterly report.pdf"
            chunk_bytes = 1024

            [[routes]]
            url = "/files"
            type = "dir"
            path = "./data"
            "#,
        );
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].kind, RouteKind::File);
        assert_eq!(config.routes[1].kind, RouteKind::Dir);
        assert_eq!(config.routes[0].chunk_bytes, Some(1024));
        assert_eq!(config.routes[1].disposition, None);
    }

    #[test]
    fn test_transfer_options_merge() {
        let config = parse(
            r#"
            [transfer]
            delay_secs = 0.5
            expires_secs = 60
            content_type = "application/pdf"

            [[routes]]
            url = "/a"
            type = "file"
            path = "a.bin"
            chunk_bytes = 100
            with_disposition = false
            content_type = "text/plain"

            [[routes]]
            url = "/b"
            type = "file"
            path = "b.bin"
            disposition = "b.txt"
            "#,
        );

        let a = config.transfer_options(&config.routes[0]).unwrap();
        assert_eq!(a.throttle.chunk_bytes(), 100);
        assert_eq!(a.throttle.delay(), Duration::from_millis(500));
        assert!(!a.with_disposition);
        assert_eq!(a.content_type.as_deref(), Some("text/plain"));
        assert_eq!(a.expires_secs, Some(60));

        let b = config.transfer_options(&config.routes[1]).unwrap();
        assert_eq!(b.throttle.chunk_bytes(), 40_960);
        assert!(b.with_disposition);
        assert_eq!(b.disposition.as_deref(), Some("b.txt"));
        assert_eq!(b.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_invalid_throttle() {
        let config = parse(
            r#"
            [[routes]]
            url = "/a"
            type = "file"
            path = "a.bin"
            chunk_bytes = 0
            "#,
        );
        assert_eq!(
            config.transfer_options(&config.routes[0]),
            Err(ThrottleError::ZeroChunk)
        );
    }
}
