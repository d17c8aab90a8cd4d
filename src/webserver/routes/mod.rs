use crate::webserver::{models::NotFoundResponse, state::AppState};
use axum::{
    body::Body,
    extract::{ws::WebSocketUpgrade, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;

pub mod control;
pub mod crud;
pub mod faults;
pub mod payloads;
pub mod status;
pub mod ws;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api_routes())
        .merge(control::routes())
        .fallback(fallback)
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .merge(crud::routes())
        .merge(faults::routes())
        .merge(payloads::routes())
}

/// Anything unrouted: WebSocket upgrade, then static files, then JSON 404
async fn fallback(
    State(state): State<Arc<AppState>>,
    upgrade: Option<WebSocketUpgrade>,
    request: Request,
) -> Response {
    let endpoint = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    if let Some(upgrade) = upgrade {
        return ws::upgrade(upgrade, &state, request.uri().path());
    }

    if let Some(dir) = state.server.static_dir.as_ref() {
        let response = ServeDir::new(dir)
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {});
        if response.status() != StatusCode::NOT_FOUND {
            return response.map(Body::new).into_response();
        }
    }

    not_found(&endpoint)
}

fn not_found(endpoint: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(NotFoundResponse::new(endpoint))).into_response()
}
