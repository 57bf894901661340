//! Shared application state passed to every handler via Axum's `State` extractor.

use std::sync::Arc;
use std::time::Instant;

use mcp_letscloud::context::ContextHub;
use mcp_letscloud::dispatch::Dispatcher;

use crate::config::Config;
use crate::routes::clients::ClientStore;

/// Shared application state. Cheap to clone; every field is a handle.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration loaded at startup.
    pub config: Arc<Config>,
    /// Monotonic instant when the server started (for uptime calculation).
    pub start_time: Instant,
    /// The one tool dispatcher. Stdio, WebSocket, and REST all route
    /// through this instance; it owns the lazily-built upstream client.
    pub dispatcher: Arc<Dispatcher>,
    /// Context validation rules plus the keyed context store.
    pub contexts: Arc<ContextHub>,
    /// In-memory API client registry.
    pub clients: ClientStore,
}

impl AppState {
    /// Build runtime state from configuration.
    pub fn new(config: Config) -> Self {
        let dispatcher = Dispatcher::new(config.upstream.clone());
        let contexts = ContextHub::new(config.context.actions());
        Self {
            config: Arc::new(config),
            start_time: Instant::now(),
            dispatcher: Arc::new(dispatcher),
            contexts: Arc::new(contexts),
            clients: ClientStore::default(),
        }
    }
}
