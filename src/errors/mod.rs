/// Error handling for the fixture server
///
/// Real failures (missing connection, timeout) are returned to the immediate
/// caller. Intentional protocol faults produced by the fault routes are not
/// errors and never surface here.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("No websocket connection")]
    NoConnection,

    #[error("Timeout waiting for message{} after {timeout_ms}ms", id_suffix(.id))]
    Timeout {
        timeout_ms: u64,
        id: Option<String>,
    },

    #[error("Websocket connection closed before a reply arrived")]
    ConnectionClosed,

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn id_suffix(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" with id '{}'", id),
        None => String::new(),
    }
}

impl FixtureError {
    /// Short machine-readable code used by the control routes
    pub fn code(&self) -> &'static str {
        match self {
            FixtureError::NoConnection => "NO_CONNECTION",
            FixtureError::Timeout { .. } => "TIMEOUT",
            FixtureError::ConnectionClosed => "CONNECTION_CLOSED",
            FixtureError::Bind { .. } => "BIND",
            FixtureError::InvalidAddress(_) => "INVALID_ADDRESS",
            FixtureError::Config(_) => "CONFIG",
            FixtureError::Serialization(_) => "SERIALIZATION",
            FixtureError::Io(_) => "IO",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            FixtureError::NoConnection => StatusCode::SERVICE_UNAVAILABLE,
            FixtureError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            FixtureError::ConnectionClosed => StatusCode::BAD_GATEWAY,
            FixtureError::Serialization(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FixtureError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}
