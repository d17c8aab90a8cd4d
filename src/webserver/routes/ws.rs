/// WebSocket upgrade entry point
///
/// The application under test may connect on any path, so the upgrade is
/// accepted from the router fallback rather than a dedicated route.
use axum::{extract::ws::WebSocketUpgrade, response::Response};
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{state::AppState, ws::connection::handle_connection},
};

/// Complete the handshake and hand the socket to the hub
pub fn upgrade(ws: WebSocketUpgrade, state: &AppState, path: &str) -> Response {
    logger::debug(LogTag::Ws, &format!("WebSocket upgrade requested on {}", path));

    let registry = Arc::clone(&state.registry);
    ws.on_upgrade(move |socket| handle_connection(socket, registry))
}
