// src/state.rs

use crate::{config::RelayConfig, registry::Registry};
use std::sync::Arc;
use tokio::sync::Mutex;

/// The application's shared state, accessible from all request handlers.
/// Created once at startup and handed to every connection through Axum's state management.
#[derive(Clone)]
pub struct RelayState {
    pub registry: Arc<Mutex<Registry>>,
    pub config: Arc<RelayConfig>,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        let registry = Registry::new(config.room_keying, config.outbound_buffer);
        Self {
            registry: Arc::new(Mutex::new(registry)),
            config: Arc::new(config),
        }
    }

    /// Drops every tracked connection. Their writer tasks close the sockets.
    pub async fn shutdown(&self) {
        self.registry.lock().await.shutdown();
    }
}
