#![allow(dead_code)]

use fixture_server::{FixtureConfig, FixtureServer};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Defaults with the slow faults shortened
pub fn fast_config() -> FixtureConfig {
    let mut config = FixtureConfig::default();
    config.faults.delay_ms = 200;
    config.faults.stream_interval_ms = 20;
    config.server.default_wait_timeout_ms = 1000;
    config
}

pub async fn start(config: FixtureConfig) -> (FixtureServer, String) {
    let mut server = FixtureServer::new(config);
    server.start(0).await.expect("server starts on an ephemeral port");
    let base = server.base_url().expect("running server has a base url");
    (server, base)
}

pub fn ws_url(base: &str) -> String {
    format!("{}/", base.replacen("http://", "ws://", 1))
}

/// Connect and consume the WELCOME frame
pub async fn connect_ws(base: &str) -> WsClient {
    let (mut client, _) = tokio_tungstenite::connect_async(ws_url(base))
        .await
        .expect("websocket handshake");

    let welcome = next_json(&mut client).await;
    assert_eq!(welcome["type"], "WELCOME");
    client
}

/// Next text frame parsed as JSON, failing the test after 2s
pub async fn next_json(client: &mut WsClient) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("frame before timeout")
            .expect("stream still open")
            .expect("valid frame");

        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("server frames are JSON");
        }
    }
}

/// Next frame that is not an ECHO
pub async fn next_non_echo(client: &mut WsClient) -> Value {
    loop {
        let value = next_json(client).await;
        if value["type"] != "ECHO" {
            return value;
        }
    }
}

pub async fn send_text(client: &mut WsClient, text: &str) {
    client
        .send(Message::Text(text.to_string()))
        .await
        .expect("send frame");
}
