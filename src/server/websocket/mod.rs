//! WebSocket infrastructure for real-time delivery.
//!
//! Every live connection joins the room of its user identity; events are
//! addressed to rooms through the [`RealtimeBroker`] trait.

mod broker;
pub mod connection;
pub mod handler;
pub mod messages;

pub use broker::{BrokerError, BrokerSlot, RealtimeBroker};
pub use connection::{ConnectionManager, RoomDelivery, SendError, DEFAULT_CONNECTION_BUFFER};
pub use handler::ws_handler;
