//! Fault-injecting HTTP + WebSocket fixture server
//!
//! Start a [`FixtureServer`] on an ephemeral port, point the app under test
//! at it, and use its [`ConnectionRegistry`] to await replies from the app.

pub mod config;
pub mod errors;
pub mod logger;
pub mod webserver;

pub use config::{FaultConfig, FixtureConfig, ServerConfig};
pub use errors::FixtureError;
pub use webserver::ws::{AppConnection, ConnectionRegistry, DEFAULT_WAIT_TIMEOUT};
pub use webserver::FixtureServer;
