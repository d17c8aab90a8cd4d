/// WebSocket hub: the registry of application connections
///
/// The registry owns the single "current" connection slot that the
/// correlation layer sends through. A newer connection replaces the
/// reference; a closing connection clears it only if it is still current.
/// Every open connection is also tracked so shutdown can terminate all of
/// them, not just the current one.
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

use crate::{
    errors::FixtureError,
    logger::{self, LogTag},
};

use super::correlation::{self, Dispatcher, PendingReply};
use super::metrics::HubMetrics;

/// Connection ID (unique per WebSocket connection)
pub type ConnectionId = u64;

/// Per-connection lifecycle; `Closed` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }
}

/// Handle to one attached application connection
///
/// Cheap to clone. Sending goes through the connection task's outbound
/// queue; waiting goes through the connection's dispatcher.
#[derive(Clone)]
pub struct AppConnection {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
    dispatcher: Arc<Dispatcher>,
    terminate: Arc<Notify>,
    state: Arc<AtomicU8>,
    connected_at: DateTime<Utc>,
    default_timeout: Duration,
}

impl AppConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        // Closed is terminal
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != ConnectionState::Closed as u8).then_some(state as u8)
            });
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Queue raw text for the client
    pub async fn send_text(&self, text: String) -> Result<(), FixtureError> {
        self.outbound
            .send(text)
            .await
            .map_err(|_| FixtureError::ConnectionClosed)
    }

    /// Queue a JSON value for the client
    pub async fn send_json<T: Serialize>(&self, value: &T) -> Result<(), FixtureError> {
        self.send_text(serde_json::to_string(value)?).await
    }

    /// Register a waiter without awaiting it yet
    pub fn register_waiter(&self, id: Option<&str>) -> Result<PendingReply, FixtureError> {
        self.dispatcher.register(id.map(str::to_string))
    }

    /// Await the next message (or the one carrying `id`) on this connection
    pub async fn wait_for_message(
        &self,
        id: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Value, FixtureError> {
        self.register_waiter(id)?
            .wait(timeout.unwrap_or(self.default_timeout))
            .await
    }

    /// Send `{ message, id }` and await the reply carrying the same id
    pub async fn send_message_and_wait_for_response(
        &self,
        message: impl Into<Value>,
    ) -> Result<Value, FixtureError> {
        correlation::send_message_and_wait_for_response(self, message).await
    }

    pub(crate) fn terminate_signal(&self) -> &Arc<Notify> {
        &self.terminate
    }
}

/// Central registry of WebSocket connections
pub struct ConnectionRegistry {
    /// The connection correlation traffic goes through
    current: RwLock<Option<AppConnection>>,

    /// Every open connection (connection_id → handle)
    connections: RwLock<HashMap<ConnectionId, AppConnection>>,

    next_conn_id: AtomicU64,

    /// Set by `close_all`; refuses late upgrades until `reopen`
    closed: AtomicBool,

    metrics: Arc<HubMetrics>,

    /// Outbound queue depth per connection
    buffer_size: usize,

    default_timeout: Duration,
}

impl ConnectionRegistry {
    pub fn new(buffer_size: usize, default_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(None),
            connections: RwLock::new(HashMap::new()),
            next_conn_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            metrics: HubMetrics::new(),
            buffer_size: buffer_size.max(1),
            default_timeout,
        })
    }

    /// Register a new connection and make it current
    ///
    /// Fails with `ConnectionClosed` once `close_all` has run, so an upgrade
    /// finishing during shutdown cannot outlive the server.
    pub fn register_connection(
        &self,
    ) -> Result<(AppConnection, mpsc::Receiver<String>), FixtureError> {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.buffer_size);

        let connection = AppConnection {
            id: conn_id,
            outbound: tx,
            dispatcher: Dispatcher::new(),
            terminate: Arc::new(Notify::new()),
            state: Arc::new(AtomicU8::new(ConnectionState::Connecting as u8)),
            connected_at: Utc::now(),
            default_timeout: self.default_timeout,
        };

        let replaced = {
            let mut connections = self.connections.write();
            if self.closed.load(Ordering::Acquire) {
                return Err(FixtureError::ConnectionClosed);
            }
            connections.insert(conn_id, connection.clone());
            self.current.write().replace(connection.clone())
        };
        self.metrics.connection_opened();

        if let Some(previous) = replaced {
            logger::debug(
                LogTag::Ws,
                &format!(
                    "Connection {} replaces connection {} as current",
                    conn_id,
                    previous.id()
                ),
            );
        }
        logger::debug(
            LogTag::Ws,
            &format!(
                "Connection {} registered (active={})",
                conn_id,
                self.active_connections()
            ),
        );

        Ok((connection, rx))
    }

    /// Unregister a connection; clears the current slot only if it matches
    pub fn unregister_connection(&self, conn_id: ConnectionId) {
        let Some(connection) = self.connections.write().remove(&conn_id) else {
            return;
        };

        connection.set_state(ConnectionState::Closed);
        connection.dispatcher().close();
        self.metrics.connection_closed();

        let mut current = self.current.write();
        if current.as_ref().map(AppConnection::id) == Some(conn_id) {
            *current = None;
        }
        drop(current);

        logger::debug(
            LogTag::Ws,
            &format!(
                "Connection {} unregistered (active={})",
                conn_id,
                self.active_connections()
            ),
        );
    }

    /// The connection correlated messages go through
    pub fn current(&self) -> Option<AppConnection> {
        self.current.read().clone()
    }

    pub fn current_connection_id(&self) -> Option<ConnectionId> {
        self.current.read().as_ref().map(AppConnection::id)
    }

    /// Await a message on the current connection
    ///
    /// Fails immediately with `NoConnection` when nothing is attached.
    pub async fn wait_for_message(
        &self,
        id: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Value, FixtureError> {
        let connection = self.current().ok_or(FixtureError::NoConnection)?;
        connection.wait_for_message(id, timeout).await
    }

    /// Correlated request/response over the current connection
    pub async fn send_message_and_wait_for_response(
        &self,
        message: impl Into<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, FixtureError> {
        let connection = self.current().ok_or(FixtureError::NoConnection)?;
        correlation::send_message_and_wait_for_response_with_timeout(
            &connection,
            message,
            timeout.unwrap_or(self.default_timeout),
        )
        .await
    }

    /// Forcibly terminate every open connection and refuse new ones
    pub fn close_all(&self) -> usize {
        let drained: Vec<AppConnection> = {
            let mut connections = self.connections.write();
            self.closed.store(true, Ordering::Release);
            *self.current.write() = None;
            connections.drain().map(|(_, c)| c).collect()
        };

        for connection in &drained {
            connection.set_state(ConnectionState::Closed);
            connection.dispatcher().close();
            connection.terminate_signal().notify_one();
            self.metrics.connection_closed();
        }

        if !drained.is_empty() {
            logger::debug(
                LogTag::Ws,
                &format!("Terminated {} websocket connection(s)", drained.len()),
            );
        }

        drained.len()
    }

    /// Accept connections again, with zeroed metrics
    pub fn reopen(&self) {
        let _connections = self.connections.write();
        self.closed.store(false, Ordering::Release);
        self.metrics.reset();
    }

    pub fn active_connections(&self) -> usize {
        self.connections.read().len()
    }

    /// Waiters pending on the current connection
    pub fn pending_waiters(&self) -> usize {
        self.current
            .read()
            .as_ref()
            .map(|c| c.dispatcher().pending())
            .unwrap_or(0)
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        self.metrics.clone()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}
