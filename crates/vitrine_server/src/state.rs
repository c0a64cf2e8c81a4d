//! Shared application state for the axum server.

use std::sync::Arc;

use vitrine_core::Orchestrator;

/// Shared state accessible by all API handlers.
pub struct AppStateInner {
    pub orchestrator: Orchestrator,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}
