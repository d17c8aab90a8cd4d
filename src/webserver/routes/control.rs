/// Control surface for test runners that drive the correlation layer over HTTP
///
/// In-process harnesses call `ConnectionRegistry` directly; these routes
/// expose the same operations to runners living in another process.
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    logger::{self, LogTag},
    webserver::{
        state::AppState,
        ws::{ConnectionState, HubMetricsSnapshot},
    },
};

// ===== REQUEST / RESPONSE TYPES =====

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub message: Value,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct WaitQuery {
    pub id: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ControlStatusResponse {
    pub connected: bool,
    pub connection_id: Option<u64>,
    pub connection_state: Option<ConnectionState>,
    pub connected_at: Option<DateTime<Utc>>,
    pub pending_waiters: usize,
    pub active_connections: usize,
    pub metrics: HubMetricsSnapshot,
}

// ===== ROUTES =====

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/control/status", get(control_status))
        .route("/control/send", post(send_and_wait))
        .route("/control/wait", get(wait_for_message))
}

/// GET /control/status - current connection and hub counters
async fn control_status(State(state): State<Arc<AppState>>) -> Json<ControlStatusResponse> {
    let registry = &state.registry;
    let current = registry.current();

    Json(ControlStatusResponse {
        connected: current.is_some(),
        connection_id: current.as_ref().map(|c| c.id()),
        connection_state: current.as_ref().map(|c| c.state()),
        connected_at: current.as_ref().map(|c| c.connected_at()),
        pending_waiters: registry.pending_waiters(),
        active_connections: registry.active_connections(),
        metrics: registry.metrics().snapshot(),
    })
}

/// POST /control/send - correlated request/response through the current connection
async fn send_and_wait(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendRequest>,
) -> Response {
    let timeout = request.timeout_ms.map(Duration::from_millis);

    match state
        .registry
        .send_message_and_wait_for_response(request.message, timeout)
        .await
    {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            logger::debug(LogTag::Correlation, &format!("Control send failed: {}", e));
            e.into_response()
        }
    }
}

/// GET /control/wait - next message, or the message carrying `id`
async fn wait_for_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WaitQuery>,
) -> Response {
    let timeout = query.timeout_ms.map(Duration::from_millis);

    match state
        .registry
        .wait_for_message(query.id.as_deref(), timeout)
        .await
    {
        Ok(message) => Json(message).into_response(),
        Err(e) => {
            logger::debug(LogTag::Correlation, &format!("Control wait failed: {}", e));
            e.into_response()
        }
    }
}
