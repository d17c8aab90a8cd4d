/// Correlation layer: await a specific reply on a WebSocket connection
///
/// Every connection owns one `Dispatcher`. Waiters are kept in a table keyed
/// by correlation id plus one fallback list for "next message" waiters, so
/// routing an inbound message costs one map lookup no matter how many waiters
/// are pending. A message is offered to every matching waiter: an id-scoped
/// waiter and an unscoped waiter on the same connection both observe it.
///
/// A waiter completes exactly once. The reply is handed over while the table
/// lock is held, and the timeout path removes the waiter under the same lock,
/// so whichever side gets the lock first decides the outcome.
use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::{
    errors::FixtureError,
    logger::{self, LogTag},
};

use super::hub::AppConnection;
use super::message::{CorrelatedRequest, InboundMessage};

/// Default deadline for a correlated wait
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(5000);

type WaiterKey = u64;

struct Waiter {
    key: WaiterKey,
    reply: oneshot::Sender<Value>,
}

#[derive(Default)]
struct DispatchTable {
    by_id: HashMap<String, Vec<Waiter>>,
    any: Vec<Waiter>,
    closed: bool,
}

impl DispatchTable {
    fn len(&self) -> usize {
        self.by_id.values().map(Vec::len).sum::<usize>() + self.any.len()
    }
}

/// Per-connection waiter table
pub struct Dispatcher {
    table: Mutex<DispatchTable>,
    next_key: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(DispatchTable::default()),
            next_key: AtomicU64::new(1),
        })
    }

    /// Register a one-shot waiter
    ///
    /// With `Some(id)` the waiter matches only a JSON message whose `id` field
    /// is that string. With `None` it matches the next parseable message.
    pub fn register(self: &Arc<Self>, id: Option<String>) -> Result<PendingReply, FixtureError> {
        let (tx, rx) = oneshot::channel();
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);

        {
            let mut table = self.table.lock();
            if table.closed {
                return Err(FixtureError::ConnectionClosed);
            }
            let waiter = Waiter { key, reply: tx };
            match &id {
                Some(id) => table.by_id.entry(id.clone()).or_default().push(waiter),
                None => table.any.push(waiter),
            }
        }

        logger::debug(
            LogTag::Correlation,
            &format!("Waiter {} registered (id={:?})", key, id),
        );

        Ok(PendingReply {
            dispatcher: Arc::clone(self),
            key,
            id,
            rx,
        })
    }

    /// Offer an inbound message to the pending waiters
    ///
    /// Returns how many waiters were resolved. Non-JSON messages resolve
    /// nothing.
    pub fn dispatch(&self, message: &InboundMessage) -> usize {
        let value = match message {
            InboundMessage::Json(value) => value,
            InboundMessage::Text(_) => return 0,
        };

        let mut table = self.table.lock();
        let mut resolved = 0;

        if let Some(scoped) = message.correlation_id().and_then(|id| table.by_id.remove(id)) {
            for waiter in scoped {
                if waiter.reply.send(value.clone()).is_ok() {
                    resolved += 1;
                }
            }
        }

        for waiter in table.any.drain(..) {
            if waiter.reply.send(value.clone()).is_ok() {
                resolved += 1;
            }
        }

        resolved
    }

    /// Parse and dispatch raw text
    pub fn dispatch_text(&self, text: &str) -> usize {
        self.dispatch(&InboundMessage::parse(text))
    }

    /// Remove a waiter; false when it was already resolved or dropped
    fn deregister(&self, key: WaiterKey, id: Option<&str>) -> bool {
        let mut table = self.table.lock();
        match id {
            Some(id) => {
                let Some(waiters) = table.by_id.get_mut(id) else {
                    return false;
                };
                let before = waiters.len();
                waiters.retain(|w| w.key != key);
                let removed = waiters.len() != before;
                if waiters.is_empty() {
                    table.by_id.remove(id);
                }
                removed
            }
            None => {
                let before = table.any.len();
                table.any.retain(|w| w.key != key);
                table.any.len() != before
            }
        }
    }

    /// Fail every pending waiter and refuse new ones
    pub fn close(&self) {
        let mut table = self.table.lock();
        table.closed = true;
        let dropped = table.len();
        table.by_id.clear();
        table.any.clear();

        if dropped > 0 {
            logger::debug(
                LogTag::Correlation,
                &format!("Dispatcher closed with {} pending waiter(s)", dropped),
            );
        }
    }

    /// Number of waiters still registered
    pub fn pending(&self) -> usize {
        self.table.lock().len()
    }
}

/// A registered waiter
///
/// Dropping it deregisters the waiter, so an abandoned wait never lingers in
/// the table.
pub struct PendingReply {
    dispatcher: Arc<Dispatcher>,
    key: WaiterKey,
    id: Option<String>,
    rx: oneshot::Receiver<Value>,
}

impl PendingReply {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Wait for the matching message or fail after `timeout`
    pub async fn wait(mut self, timeout: Duration) -> Result<Value, FixtureError> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(value)) => {
                logger::debug(
                    LogTag::Correlation,
                    &format!("Waiter {} resolved (id={:?})", self.key, self.id),
                );
                Ok(value)
            }
            Ok(Err(_)) => Err(FixtureError::ConnectionClosed),
            Err(_) => {
                if self.dispatcher.deregister(self.key, self.id.as_deref()) {
                    logger::debug(
                        LogTag::Correlation,
                        &format!("Waiter {} timed out (id={:?})", self.key, self.id),
                    );
                    return Err(self.timeout_error(timeout));
                }
                // Lost the race: the reply was handed over (or the
                // connection closed) while the timer fired.
                match self.rx.try_recv() {
                    Ok(value) => Ok(value),
                    Err(oneshot::error::TryRecvError::Closed) => Err(FixtureError::ConnectionClosed),
                    Err(oneshot::error::TryRecvError::Empty) => Err(self.timeout_error(timeout)),
                }
            }
        }
    }

    fn timeout_error(&self, timeout: Duration) -> FixtureError {
        FixtureError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
            id: self.id.clone(),
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.dispatcher.deregister(self.key, self.id.as_deref());
    }
}

/// Correlation id: unix millis plus a random suffix
///
/// Not collision-proof; acceptable for one test run.
pub fn generate_correlation_id() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{}-{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Send `{ message, id }` over `connection` and await the reply carrying `id`
///
/// The waiter is registered before the send so a fast reply cannot be missed.
pub async fn send_message_and_wait_for_response(
    connection: &AppConnection,
    message: impl Into<Value>,
) -> Result<Value, FixtureError> {
    send_message_and_wait_for_response_with_timeout(connection, message, connection.default_timeout()).await
}

pub async fn send_message_and_wait_for_response_with_timeout(
    connection: &AppConnection,
    message: impl Into<Value>,
    timeout: Duration,
) -> Result<Value, FixtureError> {
    let request = CorrelatedRequest {
        message: message.into(),
        id: generate_correlation_id(),
    };

    let pending = connection.register_waiter(Some(&request.id))?;
    connection.send_json(&request).await?;

    logger::debug(
        LogTag::Correlation,
        &format!(
            "Connection {}: sent correlated message (id={})",
            connection.id(),
            request.id
        ),
    );

    pending.wait(timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_msg(value: Value) -> InboundMessage {
        InboundMessage::Json(value)
    }

    #[tokio::test]
    async fn test_scoped_waiter_ignores_other_ids() {
        let dispatcher = Dispatcher::new();
        let pending = dispatcher.register(Some("42".to_string())).unwrap();

        assert_eq!(dispatcher.dispatch(&json_msg(json!({"id": "41", "v": 1}))), 0);
        assert_eq!(dispatcher.dispatch(&json_msg(json!({"id": "42", "v": 2}))), 1);
        assert_eq!(dispatcher.dispatch(&json_msg(json!({"id": "42", "v": 3}))), 0);

        let reply = pending.wait(Duration::from_millis(100)).await.unwrap();
        assert_eq!(reply, json!({"id": "42", "v": 2}));
        assert_eq!(dispatcher.pending(), 0);
    }

    #[tokio::test]
    async fn test_unscoped_waiter_takes_next_json_only() {
        let dispatcher = Dispatcher::new();
        let pending = dispatcher.register(None).unwrap();

        assert_eq!(dispatcher.dispatch_text("not json"), 0);
        assert_eq!(dispatcher.dispatch_text(r#"{"anything":true}"#), 1);

        let reply = pending.wait(Duration::from_millis(100)).await.unwrap();
        assert_eq!(reply, json!({"anything": true}));
    }

    #[tokio::test]
    async fn test_scoped_and_unscoped_both_observe_message() {
        let dispatcher = Dispatcher::new();
        let scoped = dispatcher.register(Some("a".to_string())).unwrap();
        let any = dispatcher.register(None).unwrap();
        let twin = dispatcher.register(Some("a".to_string())).unwrap();

        assert_eq!(dispatcher.dispatch_text(r#"{"id":"a"}"#), 3);

        let timeout = Duration::from_millis(100);
        assert_eq!(scoped.wait(timeout).await.unwrap(), json!({"id": "a"}));
        assert_eq!(any.wait(timeout).await.unwrap(), json!({"id": "a"}));
        assert_eq!(twin.wait(timeout).await.unwrap(), json!({"id": "a"}));
    }

    #[tokio::test]
    async fn test_timeout_deregisters_waiter() {
        let dispatcher = Dispatcher::new();
        let pending = dispatcher.register(Some("late".to_string())).unwrap();
        assert_eq!(dispatcher.pending(), 1);

        let err = pending.wait(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, FixtureError::Timeout { timeout_ms: 20, .. }));
        assert_eq!(dispatcher.pending(), 0);

        // A late reply finds nobody to resolve
        assert_eq!(dispatcher.dispatch_text(r#"{"id":"late"}"#), 0);
    }

    #[tokio::test]
    async fn test_dropped_wait_leaves_no_waiter() {
        let dispatcher = Dispatcher::new();
        {
            let _pending = dispatcher.register(None).unwrap();
            let _scoped = dispatcher.register(Some("x".to_string())).unwrap();
            assert_eq!(dispatcher.pending(), 2);
        }
        assert_eq!(dispatcher.pending(), 0);
    }

    #[tokio::test]
    async fn test_close_fails_pending_and_new_waiters() {
        let dispatcher = Dispatcher::new();
        let pending = dispatcher.register(Some("1".to_string())).unwrap();

        dispatcher.close();

        let err = pending.wait(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, FixtureError::ConnectionClosed));
        assert!(matches!(
            dispatcher.register(None),
            Err(FixtureError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_correlation_id_shape() {
        let id = generate_correlation_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert!(suffix.parse::<u32>().unwrap() < 1_000_000);
    }
}
