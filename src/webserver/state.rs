/// Shared application state for the webserver
///
/// Built by `FixtureServer` and handed to every route handler. The
/// connection registry is the only place the current WebSocket connection
/// lives.
use std::sync::Arc;

use crate::config::{FaultConfig, FixtureConfig, ServerConfig};
use crate::webserver::models::UserStore;
use crate::webserver::ws::ConnectionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<ServerConfig>,
    pub faults: Arc<FaultConfig>,

    /// Central WebSocket registry
    pub registry: Arc<ConnectionRegistry>,

    /// Demo records for the CRUD routes
    pub users: Arc<UserStore>,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: &FixtureConfig, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            server: Arc::new(config.server.clone()),
            faults: Arc::new(config.faults.clone()),
            registry,
            users: Arc::new(UserStore::seeded()),
            startup_time: chrono::Utc::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}
