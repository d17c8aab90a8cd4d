/// WebSocket hub and correlation layer
///
/// ## Key Components
/// - `hub`: registry of application connections and the current-connection slot
/// - `connection`: per-socket task (WELCOME, ECHO, outbound forwarding)
/// - `correlation`: id-keyed waiters with timeout
/// - `message`: wire schema
/// - `metrics`: hub counters
pub mod connection;
pub mod correlation;
pub mod hub;
pub mod message;
pub mod metrics;

pub use correlation::{
    generate_correlation_id, send_message_and_wait_for_response,
    send_message_and_wait_for_response_with_timeout, Dispatcher, PendingReply,
    DEFAULT_WAIT_TIMEOUT,
};
pub use hub::{AppConnection, ConnectionId, ConnectionRegistry, ConnectionState};
pub use message::{CorrelatedRequest, InboundMessage, ServerMessage};
pub use metrics::HubMetricsSnapshot;
