//! WebSocket connection manager.
//!
//! Tracks every live connection, grouped into one room per user identity.
//! A user may be connected from several tabs or devices at once; each
//! connection gets its own id and outgoing channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};

use super::messages::ServerMessage;

pub const DEFAULT_CONNECTION_BUFFER: usize = 32;

/// Error type for targeted sends.
#[derive(Debug, Clone, PartialEq)]
pub enum SendError {
    /// The target connection is not registered.
    NotConnected,
    /// The connection channel is closed or full.
    Disconnected,
}

/// Result of addressing a room.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RoomDelivery {
    pub delivered: usize,
    /// Connections whose channel was closed or full.
    pub failed: Vec<u64>,
}

/// Manages all active WebSocket connections.
///
/// identity -> (connection id -> outgoing sender)
pub struct ConnectionManager {
    rooms: RwLock<HashMap<String, HashMap<u64, mpsc::Sender<ServerMessage>>>>,
    next_connection_id: AtomicU64,
    buffer: usize,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_BUFFER)
    }
}

impl ConnectionManager {
    /// `buffer` is the per-connection outgoing queue size.
    pub fn new(buffer: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Joins a new connection to the room of `identity`.
    ///
    /// Returns the connection id and the receiver the caller should forward
    /// to the socket.
    pub async fn register(&self, identity: &str) -> (u64, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(identity.to_string())
            .or_default()
            .insert(connection_id, tx);

        (connection_id, rx)
    }

    /// Removes a connection, dropping the room once it is empty.
    pub async fn unregister(&self, identity: &str, connection_id: u64) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(identity) {
            room.remove(&connection_id);
            if room.is_empty() {
                rooms.remove(identity);
            }
        }
    }

    /// Sends to a single connection, waiting for channel capacity.
    pub async fn send_to_connection(
        &self,
        identity: &str,
        connection_id: u64,
        message: ServerMessage,
    ) -> Result<(), SendError> {
        let sender = {
            let rooms = self.rooms.read().await;
            rooms
                .get(identity)
                .and_then(|room| room.get(&connection_id))
                .cloned()
        };
        match sender {
            Some(sender) => sender
                .send(message)
                .await
                .map_err(|_| SendError::Disconnected),
            None => Err(SendError::NotConnected),
        }
    }

    /// Sends `message` to every connection in the room of `identity`.
    ///
    /// The room is snapshotted under the read lock, so a concurrent join or
    /// leave is either fully visible or not at all. Sends never wait: a full
    /// or closed channel is a failed delivery for that connection only.
    pub async fn emit_to_room(&self, identity: &str, message: ServerMessage) -> RoomDelivery {
        let senders: Vec<(u64, mpsc::Sender<ServerMessage>)> = {
            let rooms = self.rooms.read().await;
            match rooms.get(identity) {
                Some(room) => room.iter().map(|(id, tx)| (*id, tx.clone())).collect(),
                None => return RoomDelivery::default(),
            }
        };

        let mut delivery = RoomDelivery::default();
        for (connection_id, sender) in senders {
            if sender.try_send(message.clone()).is_ok() {
                delivery.delivered += 1;
            } else {
                delivery.failed.push(connection_id);
            }
        }
        delivery
    }

    /// Number of live connections of `identity`.
    pub async fn connection_count(&self, identity: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(identity).map(|room| room.len()).unwrap_or(0)
    }

    pub async fn total_connections(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.values().map(|room| room.len()).sum()
    }

    /// Get count of identities with at least one live connection.
    pub async fn connected_user_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
