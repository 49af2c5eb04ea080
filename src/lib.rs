//! Engagement Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod engagement;
pub mod engagement_store;
pub mod feed;
pub mod notifications;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use engagement_store::{EngagementStore, InMemoryEngagementStore, SqliteEngagementStore};
pub use notifications::{InMemoryNotificationStore, NotificationStore, SqliteNotificationStore};
pub use server::{run_server, RequestsLoggingLevel};
