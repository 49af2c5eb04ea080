//! WebSocket message types.
//!
//! Every message travels in a `{type, payload}` envelope; payloads are carried
//! as JSON values so that new event kinds don't need new envelope types.

use serde::{Deserialize, Serialize};

/// Server -> Client message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    /// Event name (e.g. "connected", "notification:new").
    #[serde(rename = "type")]
    pub msg_type: String,
    pub payload: serde_json::Value,
}

impl ServerMessage {
    pub fn new(msg_type: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn empty(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Client -> Server message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Messages owned by the WebSocket layer itself.
pub mod system {
    use serde::{Deserialize, Serialize};

    /// Sent right after the connection joins its room.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct Connected {
        pub connection_id: u64,
        pub server_version: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Pong;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Error {
        pub code: String,
        pub message: String,
    }

    impl Error {
        pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                code: code.into(),
                message: message.into(),
            }
        }
    }
}

/// Notification payloads.
pub mod notification {
    use serde::{Deserialize, Serialize};

    /// Payload of `notification:unread_count`.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct UnreadCountMessage {
        pub unread_count: usize,
    }
}

pub mod msg_types {
    /// Sent by server on successful connection.
    pub const CONNECTED: &str = "connected";
    /// Client heartbeat request.
    pub const PING: &str = "ping";
    /// Server heartbeat response.
    pub const PONG: &str = "pong";
    /// Server error response.
    pub const ERROR: &str = "error";
    /// A notification was created for the room's identity.
    pub const NOTIFICATION_NEW: &str = "notification:new";
    /// The room's unread counter changed because notifications were read.
    pub const UNREAD_COUNT: &str = "notification:unread_count";
}
