pub mod config;
pub mod handlers;
pub mod state;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use jobrelay_executor::ClaudeApiExecutor;

pub use config::JobrelayConfig;
pub use handlers::router;
pub use state::AppState;
pub use store::{FileStore, PersistedState};

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over `default_level`.
pub fn init_tracing(json: bool, default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the application state described by `config`.
pub fn build_state(config: &JobrelayConfig, state_dir: &Path) -> Result<AppState> {
    let executor = ClaudeApiExecutor::new(config.executor.clone())
        .context("Failed to construct executor")?;
    let state = AppState::new(Arc::new(executor));
    match FileStore::from_config(config, state_dir) {
        Some(store) => state.with_store(store),
        None => Ok(state),
    }
}

/// Serve the REST API until Ctrl-C.
pub async fn serve(config: JobrelayConfig, state_dir: &Path) -> Result<()> {
    let state = build_state(&config, state_dir)?;
    if !state.executor.is_configured() {
        tracing::warn!(
            "{} is not set, jobs will be simulated",
            jobrelay_executor::API_KEY_ENV
        );
    }

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "jobrelay listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
