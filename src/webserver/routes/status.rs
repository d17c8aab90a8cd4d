use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{models::HealthResponse, state::AppState},
};

/// Create status routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/health", get(health_check))
}

/// GET /api/health
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    logger::verbose(LogTag::Webserver, "Health check endpoint called");

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        ws_connected: state.registry.current_connection_id().is_some(),
    })
}
