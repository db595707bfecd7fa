// src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trainer_chat_relay::{config::RelayConfig, serve, state::RelayState};

/// The main entry point for our application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_line_number(true)
        .init();

    let config = RelayConfig::from_env()?;
    let addr = config.bind_addr;
    let state = RelayState::new(config);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        room_keying = ?state.config.room_keying,
        outbound_buffer = state.config.outbound_buffer,
        "chat relay listening on ws://{}/ws",
        listener.local_addr()?
    );

    serve(listener, state, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
