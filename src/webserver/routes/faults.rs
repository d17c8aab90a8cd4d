/// Fault routes that still speak valid HTTP framing
///
/// Each route reproduces one category of misbehavior so a test can pick
/// exactly one failure mode. Faults that break framing (truncation, garbage
/// bytes) never reach the router; see `webserver::raw`.
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::StreamExt;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    logger::{self, LogTag},
    webserver::state::AppState,
};

pub const REDIRECT_TARGET: &str = "/api/get?redirected=true";

pub const STREAM_START_MARKER: &str = "--- Stream Started ---\n";
pub const STREAM_FINISH_MARKER: &str = "--- Stream Finished ---";

/// Served with `Content-Type: application/json`; never parses
pub const MALFORMED_JSON_BODY: &str =
    r#"{"message": "This payload is cut short", "items": [1, 2, 3,, "status": ok"#;

pub const SERVER_ERROR_HTML: &str = r#"
        <html>
            <body>
                <h1>503 Service Unavailable</h1>
                <p>The upstream server is currently unavailable.</p>
                <hr>
                <address>Nginx/1.18.0</address>
            </body>
        </html>
    "#;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/redirect", get(redirect))
        .route("/api/error/client-error", get(client_error))
        .route("/api/error/server-error", get(server_error))
        .route("/api/error/malformed-json", get(malformed_json))
        .route("/api/error/hang", get(hang))
        .route("/api/stream-xhr", get(stream_xhr))
        .route("/api/delay", get(delay))
}

/// GET /api/redirect - 301 to the list route
async fn redirect() -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, REDIRECT_TARGET)],
    )
        .into_response()
}

/// GET /api/error/client-error - fixed 403
async fn client_error() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "Forbidden",
            "message": "Invalid Token provided",
            "code": 4003,
        })),
    )
        .into_response()
}

/// GET /api/error/server-error - fixed 503 HTML page
async fn server_error() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        SERVER_ERROR_HTML,
    )
        .into_response()
}

/// GET /api/error/malformed-json
async fn malformed_json() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        MALFORMED_JSON_BODY,
    )
        .into_response()
}

/// GET /api/error/hang - accepts the request and never answers
async fn hang() -> StatusCode {
    logger::info(
        LogTag::Faults,
        "Hanging connection intentionally (zombie request)",
    );
    std::future::pending::<StatusCode>().await
}

/// GET /api/stream-xhr - start marker, N chunks at a fixed interval, finish marker
async fn stream_xhr(State(state): State<Arc<AppState>>) -> Response {
    let chunks = state.faults.stream_chunks;
    let interval = Duration::from_millis(state.faults.stream_interval_ms);

    let body = futures::stream::unfold(0u32, move |step| async move {
        if step == 0 {
            return Some((STREAM_START_MARKER.to_string(), 1));
        }
        if step <= chunks {
            tokio::time::sleep(interval).await;
            return Some((format!("[Chunk {}] Data received\n", step), step + 1));
        }
        if step == chunks + 1 {
            return Some((STREAM_FINISH_MARKER.to_string(), step + 1));
        }
        None
    })
    .map(Ok::<_, Infallible>);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

/// GET /api/delay - success after a fixed delay
async fn delay(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let delay_ms = state.faults.delay_ms;
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    Json(json!({
        "message": "Response received after delay",
        "delay_ms": delay_ms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_body_is_not_json() {
        assert!(serde_json::from_str::<serde_json::Value>(MALFORMED_JSON_BODY).is_err());
    }
}
