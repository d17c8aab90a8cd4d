/// Payload-shape routes: binary, compressed, large, multipart, forms, images
use axum::{
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

use crate::{
    logger::{self, LogTag},
    webserver::{models::NotFoundResponse, state::AppState},
};

pub fn routes() -> Router<Arc<AppState>> {
    // Only the compression route negotiates Content-Encoding
    let compressed = Router::new()
        .route("/api/compress", get(compress))
        .layer(CompressionLayer::new());

    Router::new()
        .route("/api/binary", get(binary))
        .route("/api/large-body", get(large_body))
        .route("/api/multipart", post(multipart_upload))
        .route("/api/form", post(legacy_form))
        .route("/api/query-and-body", post(query_and_body))
        .route("/api/image", get(image))
        .route("/api/large-image", get(large_image))
        .merge(compressed)
}

/// Deterministic pseudo-random bytes: floor(|sin(i + 12345)| * 256)
pub fn binary_payload(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| ((i as f64 + 12345.0).sin().abs() * 256.0).floor().min(255.0) as u8)
        .collect()
}

/// `large_body_mb` MiB of "X " repeated
pub fn large_body_payload(megabytes: usize) -> String {
    "X ".repeat(1024).repeat(megabytes * 512)
}

/// GET /api/binary
async fn binary(State(state): State<Arc<AppState>>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        binary_payload(state.faults.binary_len),
    )
        .into_response()
}

/// GET /api/compress - large, highly repetitive JSON array
async fn compress(State(state): State<Arc<AppState>>) -> Json<Value> {
    let items: Vec<Value> = (0..state.faults.compress_items)
        .map(|i| json!({ "id": i, "text": format!("Repeating string to compress {}", i) }))
        .collect();
    Json(Value::Array(items))
}

/// GET /api/large-body
async fn large_body(State(state): State<Arc<AppState>>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        large_body_payload(state.faults.large_body_mb),
    )
        .into_response()
}

/// POST /api/multipart - file field `multipart_data`, text field `description`
async fn multipart_upload(mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, String, usize)> = None;
    let mut description: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return (StatusCode::BAD_REQUEST, e.body_text()).into_response(),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("multipart_data") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mimetype = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, mimetype, bytes.len())),
                    Err(e) => return (StatusCode::BAD_REQUEST, e.body_text()).into_response(),
                }
            }
            Some("description") => description = field.text().await.ok(),
            _ => {}
        }
    }

    let Some((filename, mimetype, size)) = upload else {
        return (StatusCode::BAD_REQUEST, "No file uploaded.").into_response();
    };

    logger::debug(
        LogTag::Webserver,
        &format!("Multipart upload {} ({} bytes, {})", filename, size, mimetype),
    );

    Json(json!({
        "filename": filename,
        "mimetype": mimetype,
        "size": size,
        "metadata_received": description,
    }))
    .into_response()
}

/// POST /api/form - urlencoded login form
async fn legacy_form(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "type": "Legacy Form",
        "received_user": form.get("username"),
        "login_status": "active",
    }))
}

/// POST /api/query-and-body - echoes both inputs
async fn query_and_body(
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> Json<Value> {
    Json(json!({
        "received_query": query,
        "received_body": body.map(|Json(b)| b).unwrap_or(Value::Null),
        "message": "Query params and body received successfully",
    }))
}

/// GET /api/image
async fn image(State(state): State<Arc<AppState>>) -> Response {
    serve_image(&state, "img.jpg", "/api/image").await
}

/// GET /api/large-image
async fn large_image(State(state): State<Arc<AppState>>) -> Response {
    serve_image(&state, "large_img.jpg", "/api/large-image").await
}

async fn serve_image(state: &AppState, file: &str, endpoint: &str) -> Response {
    let Some(dir) = state.server.static_dir.as_ref() else {
        return (StatusCode::NOT_FOUND, Json(NotFoundResponse::new(endpoint))).into_response();
    };

    let path = dir.join("img").join(file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/jpeg")],
            bytes,
        )
            .into_response(),
        Err(e) => {
            logger::warning(
                LogTag::Webserver,
                &format!("Image {} unavailable: {}", path.display(), e),
            );
            (StatusCode::NOT_FOUND, Json(NotFoundResponse::new(endpoint))).into_response()
        }
    }
}
