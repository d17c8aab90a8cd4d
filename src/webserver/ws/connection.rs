/// WebSocket connection handler
///
/// Manages one application connection:
/// - Registration with the hub (becomes the current connection)
/// - WELCOME on open
/// - ECHO for every inbound frame, after offering it to pending waiters
/// - Forwarding of queued outbound messages
/// - Forced termination on server shutdown
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::logger::{self, LogTag};

use super::{
    hub::{AppConnection, ConnectionRegistry, ConnectionState},
    message::{InboundMessage, ServerMessage},
    metrics::HubMetrics,
};

type WsSink = SplitSink<WebSocket, Message>;

/// Handle a WebSocket connection until it closes or is terminated
pub async fn handle_connection(socket: WebSocket, registry: Arc<ConnectionRegistry>) {
    let (connection, mut outbound_rx) = match registry.register_connection() {
        Ok(registered) => registered,
        Err(e) => {
            logger::debug(LogTag::Ws, &format!("Upgrade dropped: {}", e));
            return;
        }
    };
    let conn_id = connection.id();
    let metrics = registry.metrics();

    let (mut ws_tx, mut ws_rx) = socket.split();

    logger::info(LogTag::Ws, &format!("Client connected (connection {})", conn_id));

    if let Err(e) = send_server_message(&mut ws_tx, ServerMessage::welcome()).await {
        logger::warning(
            LogTag::Ws,
            &format!("Connection {}: failed to send welcome: {}", conn_id, e),
        );
        registry.unregister_connection(conn_id);
        return;
    }
    connection.set_state(ConnectionState::Open);

    loop {
        tokio::select! {
            biased;

            // Server shutdown: drop the socket without a close handshake
            _ = connection.terminate_signal().notified() => {
                logger::debug(
                    LogTag::Ws,
                    &format!("Connection {}: terminated by server", conn_id),
                );
                break;
            }

            // Messages queued by the correlation layer
            Some(text) = outbound_rx.recv() => {
                if let Err(e) = ws_tx.send(Message::Text(text)).await {
                    logger::warning(
                        LogTag::Ws,
                        &format!("Connection {}: failed to send message: {}", conn_id, e),
                    );
                    break;
                }
            }

            // Messages from the application
            msg = ws_rx.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => {
                        logger::debug(
                            LogTag::Ws,
                            &format!("Connection {}: client closed", conn_id),
                        );
                        break;
                    }
                    Some(Err(e)) => {
                        logger::warning(
                            LogTag::Ws,
                            &format!("Connection {}: websocket error: {}", conn_id, e),
                        );
                        break;
                    }
                };

                if let Err(e) = handle_inbound(&text, &connection, &metrics, &mut ws_tx).await {
                    logger::warning(
                        LogTag::Ws,
                        &format!("Connection {}: failed to echo message: {}", conn_id, e),
                    );
                    break;
                }
            }
        }
    }

    registry.unregister_connection(conn_id);
    logger::info(LogTag::Ws, &format!("Client disconnected (connection {})", conn_id));
}

/// Log, dispatch to waiters, then echo
async fn handle_inbound(
    text: &str,
    connection: &AppConnection,
    metrics: &Arc<HubMetrics>,
    ws_tx: &mut WsSink,
) -> Result<(), axum::Error> {
    metrics.message_received();

    let inbound = InboundMessage::parse(text);
    if matches!(inbound, InboundMessage::Text(_)) {
        metrics.parse_failure();
    }

    if logger::is_debug_enabled(LogTag::Ws) {
        let shown = match &inbound {
            InboundMessage::Json(value) => format!("received message: {}", value),
            InboundMessage::Text(raw) => format!("received raw message: {}", raw),
        };
        logger::debug(
            LogTag::Ws,
            &format!("Connection {}: {}", connection.id(), shown),
        );
    }

    let matched = connection.dispatcher().dispatch(&inbound);
    if matched > 0 {
        metrics.replies_matched(matched);
    }

    send_server_message(ws_tx, ServerMessage::echo(text)).await?;
    metrics.echo_sent();
    Ok(())
}

/// Serialize and send a server message
async fn send_server_message(ws_tx: &mut WsSink, msg: ServerMessage) -> Result<(), axum::Error> {
    match msg.to_json() {
        Ok(json) => ws_tx.send(Message::Text(json)).await,
        Err(e) => {
            logger::error(
                LogTag::Ws,
                &format!("Failed to serialize message: {}", e),
            );
            Ok(()) // Don't break connection on serialization error
        }
    }
}
