use std::sync::Arc;

use sendfile::config::{self, AppState, Config};
use sendfile::logger;
use sendfile::server::{create_reusable_listener, shutdown_signal, start_server_loop};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config path (without extension) may be given as the first argument
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;

    // Tokio runtime, worker threads from config or one per CPU core
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg)?;

    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(AppState::new(cfg)?);
    start_server_loop(listener, state, shutdown_signal()).await?;
    Ok(())
}
