use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all LedgerKV endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/query", post(handler::query_handler))
        .route("/v1/invoke", post(handler::invoke_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
