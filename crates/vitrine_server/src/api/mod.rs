pub mod agents;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// Build the API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(products::router())
        .merge(agents::router())
}
