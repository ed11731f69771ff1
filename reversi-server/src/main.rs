//! Reversi game server.
//!
//! Usage: `reversi-server [config.toml]` (default `reversi.toml`; a missing
//! file means built-in defaults). `REVERSI_BIND` / `REVERSI_PORT` override
//! the file, `RUST_LOG` overrides `log_level`.

use std::env;
use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use reversi_server::transport::{self, AppStateInner};
use reversi_server::{ServerConfig, ServerError};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("reversi.toml"));

    let mut config = ServerConfig::load_or_default(&config_path)?;
    config.apply_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if config_path.exists() {
        info!(path = %config_path.display(), "loaded config");
    } else {
        info!(path = %config_path.display(), "config file not found, using defaults");
    }

    let app = transport::router(AppStateInner::shared());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(%addr, "reversi server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler; run until killed.
        std::future::pending::<()>().await;
    }
    info!("interrupt received, shutting down");
}
