/// WebSocket message schema
///
/// Server to client messages are tagged by an upper-case `type` field.
/// Client to server messages are free-form: JSON when it parses, opaque
/// text otherwise. Correlated commands follow the `{ message, id }`
/// convention; the server never enforces it.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Greeting sent on every new connection
pub const WELCOME_TEXT: &str = "Connected to Live Ticker";

// ============================================================================
// SERVER MESSAGES (Server → Client)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Sent once right after the upgrade
    Welcome { message: String },

    /// Reply to every inbound message, carrying the raw inbound text
    Echo { content: String },
}

impl ServerMessage {
    pub fn welcome() -> Self {
        ServerMessage::Welcome {
            message: WELCOME_TEXT.to_string(),
        }
    }

    pub fn echo(content: impl Into<String>) -> Self {
        ServerMessage::Echo {
            content: content.into(),
        }
    }

    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// CLIENT MESSAGES (Client → Server)
// ============================================================================

/// An inbound frame after the tolerant parse
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Json(Value),
    Text(String),
}

impl InboundMessage {
    /// Parse inbound text, falling back to opaque text on invalid JSON
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => InboundMessage::Json(value),
            Err(_) => InboundMessage::Text(text.to_string()),
        }
    }

    /// The `id` field of a JSON object message, if it is a string
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            InboundMessage::Json(value) => correlation_id_of(value),
            InboundMessage::Text(_) => None,
        }
    }
}

/// Correlation ids are compared as strings; a numeric `id` never matches
pub fn correlation_id_of(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

/// Outgoing correlated command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedRequest {
    pub message: Value,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_message_wire_format() {
        let welcome: Value = serde_json::from_str(&ServerMessage::welcome().to_json().unwrap()).unwrap();
        assert_eq!(
            welcome,
            json!({"type": "WELCOME", "message": "Connected to Live Ticker"})
        );

        let echo: Value = serde_json::from_str(&ServerMessage::echo("not json {").to_json().unwrap()).unwrap();
        assert_eq!(echo, json!({"type": "ECHO", "content": "not json {"}));
    }

    #[test]
    fn test_inbound_parse_is_tolerant() {
        assert_eq!(
            InboundMessage::parse(r#"{"id":"7","ok":true}"#).correlation_id(),
            Some("7")
        );
        assert_eq!(
            InboundMessage::parse("{broken"),
            InboundMessage::Text("{broken".to_string())
        );
        assert_eq!(InboundMessage::parse(r#"{"id":7}"#).correlation_id(), None);
        assert_eq!(InboundMessage::parse("[1,2]").correlation_id(), None);
    }

    #[test]
    fn test_correlated_request_shape() {
        let request = CorrelatedRequest {
            message: json!("getPosition:btn1"),
            id: "42".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"message": "getPosition:btn1", "id": "42"}));
    }
}
