//! WebSocket helpers for end-to-end tests

use super::constants::WS_MESSAGE_TIMEOUT_MS;
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type TestWebSocket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connects to `/v1/ws?userId=` and consumes the `connected` message.
pub async fn connect_ws(base_url: &str, user_id: &str) -> TestWebSocket {
    let ws_url = format!(
        "{}/v1/ws?userId={}",
        base_url.replace("http://", "ws://"),
        user_id
    );
    let (mut ws, _) = connect_async(ws_url)
        .await
        .expect("Failed to connect to WebSocket");

    wait_for_message(&mut ws, "connected")
        .await
        .expect("No connected message");
    ws
}

/// Waits for a message of the given type, skipping others.
pub async fn wait_for_message(ws: &mut TestWebSocket, expected_type: &str) -> Option<Value> {
    let result = timeout(Duration::from_millis(WS_MESSAGE_TIMEOUT_MS), async {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                if let Ok(json) = serde_json::from_str::<Value>(&text) {
                    if json.get("type").and_then(|t| t.as_str()) == Some(expected_type) {
                        return Some(json);
                    }
                }
            }
        }
        None
    })
    .await;

    result.ok().flatten()
}

/// Returns true if no message of the given type arrives within `wait`.
pub async fn expect_silence(ws: &mut TestWebSocket, unexpected_type: &str, wait: Duration) -> bool {
    let result = timeout(wait, async {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                if let Ok(json) = serde_json::from_str::<Value>(&text) {
                    if json.get("type").and_then(|t| t.as_str()) == Some(unexpected_type) {
                        return;
                    }
                }
            }
        }
        // Stream ended; keep waiting out the window.
        futures::future::pending::<()>().await
    })
    .await;
    result.is_err()
}
