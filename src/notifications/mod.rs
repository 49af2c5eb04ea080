//! User notifications module

mod dispatcher;
mod models;
mod schema;
mod service;
mod sqlite_store;
mod store;

pub use dispatcher::{DispatchError, NotificationDispatcher, NotificationJob};
pub use models::{
    BulkOutcome, EnrichedNotification, MarkAllReadOutcome, Notification, NotificationEvent,
    NotificationPage, NotificationType, PostMediaSummary,
};
pub use service::{NotificationService, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use sqlite_store::SqliteNotificationStore;
pub use store::{InMemoryNotificationStore, NotificationStore};
