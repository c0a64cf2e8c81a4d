//! Agents API
//!
//! GET /agents - List registered agents grouped by capability

use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/agents", get(list_agents))
}

async fn list_agents(State(state): State<AppState>) -> Json<serde_json::Value> {
    let catalog = state.orchestrator.list_available_agents();
    Json(json!({
        "success": true,
        "agents": catalog,
    }))
}
