// src/lib.rs

pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod state;
pub mod websocket;

use axum::{Router, routing::get};
use state::RelayState;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Define the application routes.
pub fn app(state: RelayState) -> Router {
    Router::new()
        .route("/ws", get(websocket::websocket_handler))
        .route("/health", get(websocket::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the relay on `listener` until `shutdown` resolves, then tears down
/// every connection.
pub async fn serve<F>(listener: TcpListener, state: RelayState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let teardown = state.clone();
    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(async move {
            shutdown.await;
            // Upgraded sockets outlive the HTTP connection, so close them here.
            teardown.shutdown().await;
        })
        .await?;

    state.shutdown().await;
    info!("relay stopped");
    Ok(())
}
