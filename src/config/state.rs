// Application state module
// Holds the loaded configuration and the routes compiled from it

use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;

use super::types::{Config, RouteKind};
use crate::transfer::{FileSender, ThrottleError};

/// A route with its transfer options already merged and validated
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub url: String,
    pub kind: RouteKind,
    pub path: PathBuf,
    pub sender: FileSender,
}

/// Application state
pub struct AppState {
    pub config: Config,
    pub routes: Vec<ResolvedRoute>,
    pub active_connections: AtomicUsize,
}

impl AppState {
    /// Compile routes, failing on the first invalid throttle setting
    pub fn new(config: Config) -> Result<Self, ThrottleError> {
        let routes = config
            .routes
            .iter()
            .map(|route| -> Result<ResolvedRoute, ThrottleError> {
                Ok(ResolvedRoute {
                    url: route.url.clone(),
                    kind: route.kind,
                    path: PathBuf::from(&route.path),
                    sender: FileSender::new(config.transfer_options(route)?),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            routes,
            active_connections: AtomicUsize::new(0),
        })
    }
}
