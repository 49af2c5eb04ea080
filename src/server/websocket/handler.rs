//! WebSocket route handler.
//!
//! Handles WebSocket upgrade, message loop, and cleanup.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::messages::{msg_types, system, ClientMessage, ServerMessage};
use crate::server::metrics;
use crate::server::session::Session;
use crate::engagement::EngagementError;
use crate::server::state::{GuardedBrokerSlot, GuardedConnectionManager};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct WsParams {
    user_id: Option<String>,
}

/// WebSocket upgrade handler for `GET /v1/ws`.
///
/// The identity comes from the `userId` query parameter, falling back to the
/// identity header. Answers 503 while the realtime broker is not attached.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    session: Option<Session>,
    Query(params): Query<WsParams>,
    State(connection_manager): State<GuardedConnectionManager>,
    State(realtime): State<GuardedBrokerSlot>,
) -> Response {
    if let Err(err) = realtime.ensure_attached() {
        warn!("Rejecting WebSocket upgrade: {}", err);
        return EngagementError::from(err).into_response();
    }

    let identity = params
        .user_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| session.map(|s| s.user_id));
    let Some(identity) = identity else {
        warn!("WebSocket connection attempt without identity");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Missing user identity" })),
        )
            .into_response();
    };

    debug!("WebSocket upgrade for user {}", identity);
    ws.on_upgrade(move |socket| handle_socket(socket, identity, connection_manager))
}

/// Handle an established WebSocket connection.
async fn handle_socket(
    socket: WebSocket,
    identity: String,
    connection_manager: GuardedConnectionManager,
) {
    let (connection_id, outgoing_rx) = connection_manager.register(&identity).await;
    metrics::ws_connection_opened();
    debug!(
        "WebSocket connected: user {} connection {}",
        identity, connection_id
    );

    let (ws_sink, ws_stream) = socket.split();

    let connected_msg = ServerMessage::new(
        msg_types::CONNECTED,
        system::Connected {
            connection_id,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    );

    let outgoing_handle = tokio::spawn(forward_outgoing(ws_sink, outgoing_rx, connected_msg));

    process_incoming(ws_stream, &identity, connection_id, &connection_manager).await;

    debug!(
        "WebSocket disconnected: user {} connection {}",
        identity, connection_id
    );
    outgoing_handle.abort();
    connection_manager.unregister(&identity, connection_id).await;
    metrics::ws_connection_closed();
}

/// Forward messages from the outgoing channel to the WebSocket.
async fn forward_outgoing(
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outgoing_rx: mpsc::Receiver<ServerMessage>,
    initial_msg: ServerMessage,
) {
    if let Ok(json) = serde_json::to_string(&initial_msg) {
        if ws_sink.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    while let Some(msg) = outgoing_rx.recv().await {
        match serde_json::to_string(&msg) {
            Ok(json) => {
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("Failed to serialize WebSocket message: {}", e);
            }
        }
    }
}

/// Process incoming messages from the WebSocket.
async fn process_incoming(
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    identity: &str,
    connection_id: u64,
    connection_manager: &GuardedConnectionManager,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => handle_client_message(msg),
                    Err(e) => {
                        debug!("Failed to parse client message: {}", e);
                        Some(ServerMessage::new(
                            msg_types::ERROR,
                            system::Error::new(
                                "parse_error",
                                format!("Invalid message format: {}", e),
                            ),
                        ))
                    }
                };
                if let Some(reply) = reply {
                    let _ = connection_manager
                        .send_to_connection(identity, connection_id, reply)
                        .await;
                }
            }
            Ok(Message::Binary(_)) => {
                debug!("Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Err(e) => {
                debug!("WebSocket error: {}", e);
                break;
            }
        }
    }
}

/// Reply to a parsed client message, if it warrants one.
fn handle_client_message(msg: ClientMessage) -> Option<ServerMessage> {
    match msg.msg_type.as_str() {
        msg_types::PING => Some(ServerMessage::new(msg_types::PONG, system::Pong)),
        other => {
            debug!("Unknown message type: {}", other);
            Some(ServerMessage::new(
                msg_types::ERROR,
                system::Error::new("unknown_type", format!("Unknown message type: {}", other)),
            ))
        }
    }
}
