mod common;

use fixture_server::FixtureError;
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn test_welcome_then_one_echo_per_message() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let (mut client, _) = tokio_tungstenite::connect_async(common::ws_url(&base))
        .await
        .unwrap();

    assert_eq!(
        common::next_json(&mut client).await,
        json!({"type": "WELCOME", "message": "Connected to Live Ticker"})
    );

    common::send_text(&mut client, "not json at all").await;
    common::send_text(&mut client, r#"{"hello":"world"}"#).await;

    assert_eq!(
        common::next_json(&mut client).await,
        json!({"type": "ECHO", "content": "not json at all"})
    );
    assert_eq!(
        common::next_json(&mut client).await,
        json!({"type": "ECHO", "content": r#"{"hello":"world"}"#})
    );

    let metrics = server.registry().metrics().snapshot();
    assert_eq!(metrics.messages_received, 2);
    assert_eq!(metrics.parse_failures, 1);
    assert_eq!(metrics.echoes_sent, 2);

    server.stop().await;
}

#[tokio::test]
async fn test_handshake_connection_header_is_only_upgrade() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let addr = base.trim_start_matches("http://");

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET / HTTP/1.1\r\n\
         Host: {}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n",
        addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut byte))
            .await
            .expect("handshake response before timeout")
            .unwrap();
        assert_eq!(n, 1, "socket closed during handshake");
        head.push(byte[0]);
    }

    let head = String::from_utf8(head).unwrap();
    assert!(head.starts_with("HTTP/1.1 101"));

    let connection: Vec<&str> = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case("connection"))
        .map(|(_, value)| value.trim())
        .collect();
    assert_eq!(connection.len(), 1);
    assert!(connection[0].eq_ignore_ascii_case("upgrade"));

    server.stop().await;
}

#[tokio::test]
async fn test_binary_frames_are_echoed_as_text() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let mut client = common::connect_ws(&base).await;

    futures::SinkExt::send(&mut client, Message::Binary(b"raw bytes".to_vec()))
        .await
        .unwrap();
    assert_eq!(
        common::next_json(&mut client).await,
        json!({"type": "ECHO", "content": "raw bytes"})
    );

    server.stop().await;
}

#[tokio::test]
async fn test_upgrade_accepted_on_any_path() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let url = format!("{}ticker/live", common::ws_url(&base));

    let (mut client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    assert_eq!(common::next_json(&mut client).await["type"], "WELCOME");

    server.stop().await;
}

#[tokio::test]
async fn test_send_and_wait_resolves_with_matching_reply() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let mut client = common::connect_ws(&base).await;
    let registry = server.registry();

    let request = tokio::spawn(async move {
        registry
            .send_message_and_wait_for_response(json!("getPosition:btn1"), None)
            .await
    });

    let command = common::next_non_echo(&mut client).await;
    assert_eq!(command["message"], "getPosition:btn1");
    let id = command["id"].as_str().unwrap().to_string();

    // A reply for some other request must not satisfy the wait
    common::send_text(&mut client, r#"{"id":"someone-else","position":{"x":0,"y":0}}"#).await;
    let reply = json!({"id": id, "position": {"x": 120, "y": 48}});
    common::send_text(&mut client, &reply.to_string()).await;

    let resolved = request.await.unwrap().unwrap();
    assert_eq!(resolved, reply);

    server.stop().await;
}

#[tokio::test]
async fn test_wait_for_message_matches_id() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let mut client = common::connect_ws(&base).await;
    let registry = server.registry();

    let waiter = {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry
                .wait_for_message(Some("42"), Some(Duration::from_secs(2)))
                .await
        })
    };

    // Let the waiter register before replies arrive
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.pending_waiters(), 1);

    common::send_text(&mut client, r#"{"id":"41","position":{"x":1}}"#).await;
    common::send_text(&mut client, r#"{"id":42,"position":{"x":2}}"#).await;
    common::send_text(&mut client, r#"{"id":"42","position":{"x":3}}"#).await;

    let message = waiter.await.unwrap().unwrap();
    assert_eq!(message, json!({"id": "42", "position": {"x": 3}}));
    assert_eq!(registry.pending_waiters(), 0);

    server.stop().await;
}

#[tokio::test]
async fn test_wait_without_id_takes_next_json_message() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let mut client = common::connect_ws(&base).await;
    let registry = server.registry();

    let waiter = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.wait_for_message(None, None).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    common::send_text(&mut client, "plain text resolves nothing").await;
    common::send_text(&mut client, r#"{"event":"clicked"}"#).await;

    assert_eq!(waiter.await.unwrap().unwrap(), json!({"event": "clicked"}));

    server.stop().await;
}

#[tokio::test]
async fn test_wait_fails_fast_without_connection() {
    let (mut server, _base) = common::start(common::fast_config()).await;
    let registry = server.registry();

    let started = Instant::now();
    let err = registry
        .wait_for_message(Some("1"), Some(Duration::from_secs(5)))
        .await
        .unwrap_err();

    assert!(matches!(err, FixtureError::NoConnection));
    assert!(started.elapsed() < Duration::from_millis(500));

    let err = registry
        .send_message_and_wait_for_response(json!("ping"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FixtureError::NoConnection));

    server.stop().await;
}

#[tokio::test]
async fn test_timeout_leaves_no_waiter_behind() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let mut client = common::connect_ws(&base).await;
    let registry = server.registry();

    let started = Instant::now();
    let err = registry
        .wait_for_message(Some("late"), Some(Duration::from_millis(150)))
        .await
        .unwrap_err();

    assert!(matches!(err, FixtureError::Timeout { timeout_ms: 150, .. }));
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(registry.pending_waiters(), 0);

    // The late reply is only echoed; nothing is resolved by it
    common::send_text(&mut client, r#"{"id":"late"}"#).await;
    assert_eq!(common::next_json(&mut client).await["type"], "ECHO");
    assert_eq!(registry.metrics().snapshot().replies_matched, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_pending_wait_fails_when_connection_closes() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let mut client = common::connect_ws(&base).await;
    let registry = server.registry();

    let waiter = {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry
                .wait_for_message(Some("never"), Some(Duration::from_secs(5)))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.close(None).await.unwrap();

    let started = Instant::now();
    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(err, FixtureError::ConnectionClosed));
    assert!(started.elapsed() < Duration::from_secs(2));

    server.stop().await;
}

#[tokio::test]
async fn test_newer_connection_becomes_current() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let registry = server.registry();

    let _first = common::connect_ws(&base).await;
    let first_id = registry.current_connection_id().unwrap();

    let mut second = common::connect_ws(&base).await;
    let second_id = registry.current_connection_id().unwrap();
    assert_ne!(first_id, second_id);
    assert_eq!(registry.active_connections(), 2);

    let request = {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry
                .send_message_and_wait_for_response(json!("whoami"), None)
                .await
        })
    };

    let command = common::next_non_echo(&mut second).await;
    let reply = json!({"id": command["id"], "connection": "second"});
    common::send_text(&mut second, &reply.to_string()).await;
    assert_eq!(request.await.unwrap().unwrap(), reply);

    server.stop().await;
}

#[tokio::test]
async fn test_stop_terminates_clients() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let mut client = common::connect_ws(&base).await;

    server.stop().await;

    let next = tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("client observes termination");
    assert!(!matches!(next, Some(Ok(Message::Text(_)))));
    assert_eq!(server.registry().active_connections(), 0);

    // A restarted server starts clean
    let addr = server.start(0).await.unwrap();
    let registry = server.registry();
    assert!(registry.current().is_none());
    assert_ne!(addr.port(), 0);

    let metrics = registry.metrics().snapshot();
    assert_eq!(metrics.total_connections, 0);
    assert_eq!(metrics.messages_received, 0);

    let base = server.base_url().unwrap();
    let _client = common::connect_ws(&base).await;
    assert_eq!(registry.metrics().snapshot().total_connections, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_control_routes() {
    let (mut server, base) = common::start(common::fast_config()).await;
    let http = reqwest::Client::new();

    let status: Value = http
        .get(format!("{}/control/status", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["connected"], false);

    let no_connection = http
        .post(format!("{}/control/send", base))
        .json(&json!({"message": "ping"}))
        .send()
        .await
        .unwrap();
    assert_eq!(no_connection.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        no_connection.json::<Value>().await.unwrap()["code"],
        "NO_CONNECTION"
    );

    let mut client = common::connect_ws(&base).await;

    let timed_out = http
        .get(format!("{}/control/wait?id=nobody&timeout_ms=100", base))
        .send()
        .await
        .unwrap();
    assert_eq!(timed_out.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(timed_out.json::<Value>().await.unwrap()["code"], "TIMEOUT");

    let send = {
        let http = http.clone();
        let url = format!("{}/control/send", base);
        tokio::spawn(async move {
            http.post(url)
                .json(&json!({"message": "getPosition:btn1", "timeout_ms": 2000}))
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        })
    };

    let command = common::next_non_echo(&mut client).await;
    let reply = json!({"id": command["id"], "position": {"x": 5, "y": 6}});
    common::send_text(&mut client, &reply.to_string()).await;
    assert_eq!(send.await.unwrap(), reply);

    let status: Value = http
        .get(format!("{}/control/status", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["connected"], true);
    assert_eq!(status["connection_state"], "open");
    assert!(status["connected_at"].is_string());
    assert_eq!(status["pending_waiters"], 0);

    server.stop().await;
}
