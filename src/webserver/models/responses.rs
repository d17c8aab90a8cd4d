/// API response type definitions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Simple health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub ws_connected: bool,
}

/// Body of every unmatched route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub error: String,
    pub endpoint: String,
}

impl NotFoundResponse {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            error: "Not Found".to_string(),
            endpoint: endpoint.into(),
        }
    }
}
