/// Configuration schemas - all config structures defined once with defaults
use crate::config_struct;
use crate::webserver::ws::DEFAULT_WAIT_TIMEOUT;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

config_struct! {
    /// Listener and WebSocket settings
    pub struct ServerConfig {
        host: String = "127.0.0.1".to_string(),
        port: u16 = 8080,

        /// Directory served for non-API paths and the image routes
        static_dir: Option<PathBuf> = None,

        /// Outbound queue depth per WebSocket connection
        ws_buffer_size: usize = 64,

        /// Timeout used by correlation waits when the caller gives none
        default_wait_timeout_ms: u64 = DEFAULT_WAIT_TIMEOUT.as_millis() as u64,
    }
}

impl ServerConfig {
    pub fn default_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.default_wait_timeout_ms)
    }
}

// ============================================================================
// FAULT CONFIGURATION
// ============================================================================

config_struct! {
    /// Timings and sizes of the fault routes
    pub struct FaultConfig {
        delay_ms: u64 = 3000,

        stream_chunks: u32 = 5,
        stream_interval_ms: u64 = 1000,

        /// Content-Length announced by the truncation route
        truncated_declared_length: usize = 1024,
        truncate_after_ms: u64 = 100,

        large_body_mb: usize = 5,
        binary_len: usize = 128,
        compress_items: usize = 1000,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Whole fixture configuration, one TOML table per section
    pub struct FixtureConfig {
        server: ServerConfig = ServerConfig::default(),
        faults: FaultConfig = FaultConfig::default(),
    }
}
