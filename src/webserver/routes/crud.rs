/// Generic REST routes over the demo user records
///
/// Nothing interesting happens here; the app under test uses these to
/// exercise ordinary GET/POST/PATCH/PUT/DELETE traffic.
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{models::UserPatch, state::AppState},
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/get", get(list_users))
        .route("/api/post", post(create_user))
        .route("/api/patch/:id", patch(update_user))
        .route("/api/put/:id", put(replace_user))
        .route("/api/delete/:id", delete(delete_user))
}

/// GET /api/get
async fn list_users(State(state): State<Arc<AppState>>) -> Json<Value> {
    let users = state.users.list();
    Json(json!({
        "meta": {
            "page": "2",
            "sort": "desc",
            "total": users.len(),
        },
        "data": users,
    }))
}

/// POST /api/post
async fn create_user(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let id = state.users.create(&body);
    logger::debug(LogTag::Webserver, &format!("Created user {}", id));

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Post request successful",
            "userId": id,
            "captured_data": body,
        })),
    )
        .into_response()
}

/// PATCH /api/patch/:id
async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    body: Option<Json<UserPatch>>,
) -> Response {
    let patch = body.map(|Json(p)| p).unwrap_or_default();
    match state.users.update(id, patch) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => user_not_found(id),
    }
}

/// PUT /api/put/:id
async fn replace_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    match state.users.replace(id, &body) {
        Some(user) => Json(json!({
            "message": "Put request successful",
            "user": user,
        }))
        .into_response(),
        None => user_not_found(id),
    }
}

/// DELETE /api/delete/:id
async fn delete_user(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Response {
    if !state.users.delete(id) {
        return user_not_found(id);
    }

    Json(json!({
        "message": "Delete request successful",
        "deletedId": id,
    }))
    .into_response()
}

fn user_not_found(id: u64) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": format!("User {} does not exist", id),
        })),
    )
        .into_response()
}
