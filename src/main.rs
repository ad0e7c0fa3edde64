//! Memo Archive server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memo_archive::config::{self, LogFormat};
use memo_archive::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = config::init().context("Invalid configuration")?;

    // Initialize tracing
    let json = config.log.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memo_archive=debug,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!(
        "Starting memo archive on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!(
        channels = config.slack.channels.channels().len(),
        "Chat import configured"
    );

    // Initialize application state
    let state = AppState::new(config).await?;
    tracing::info!("Application state initialized");

    let app = memo_archive::app(state, config.server.request_timeout);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
