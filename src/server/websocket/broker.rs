//! Room-addressed event delivery, decoupled from the HTTP request lifecycle.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::debug;

use super::connection::ConnectionManager;
use super::messages::ServerMessage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("realtime broker is not initialized")]
    NotInitialized,
    #[error("realtime broker is already attached")]
    AlreadyAttached,
}

/// Delivers named events to every live connection of an identity.
#[async_trait]
pub trait RealtimeBroker: Send + Sync {
    /// Returns the number of connections the event was handed to. An identity
    /// with no live connection is not an error: the result is 0.
    async fn emit_to_user(
        &self,
        identity: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<usize, BrokerError>;
}

#[async_trait]
impl RealtimeBroker for ConnectionManager {
    async fn emit_to_user(
        &self,
        identity: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<usize, BrokerError> {
        let delivery = self
            .emit_to_room(
                identity,
                ServerMessage {
                    msg_type: event.to_string(),
                    payload,
                },
            )
            .await;
        if !delivery.failed.is_empty() {
            debug!(
                "Failed to send {} to {} connections of {}",
                event,
                delivery.failed.len(),
                identity
            );
        }
        Ok(delivery.delivered)
    }
}

/// A broker handle that exists before the transport does.
///
/// Services are built with the slot; the room registry is attached once the
/// server is set up. Until then every emit fails with
/// [`BrokerError::NotInitialized`].
#[derive(Default)]
pub struct BrokerSlot {
    inner: OnceLock<Arc<dyn RealtimeBroker>>,
}

impl BrokerSlot {
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn attach(&self, broker: Arc<dyn RealtimeBroker>) -> Result<(), BrokerError> {
        self.inner
            .set(broker)
            .map_err(|_| BrokerError::AlreadyAttached)
    }

    pub fn is_attached(&self) -> bool {
        self.inner.get().is_some()
    }

    pub fn ensure_attached(&self) -> Result<(), BrokerError> {
        if self.is_attached() {
            Ok(())
        } else {
            Err(BrokerError::NotInitialized)
        }
    }
}

#[async_trait]
impl RealtimeBroker for BrokerSlot {
    async fn emit_to_user(
        &self,
        identity: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<usize, BrokerError> {
        match self.inner.get() {
            Some(broker) => broker.emit_to_user(identity, event, payload).await,
            None => Err(BrokerError::NotInitialized),
        }
    }
}
