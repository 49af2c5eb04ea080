//! Notification storage trait and in-memory implementation

use std::sync::RwLock;

use anyhow::Result;

use super::models::Notification;

/// Trait for notification storage operations
pub trait NotificationStore: Send + Sync {
    /// Persists a batch of notifications in one operation.
    fn insert_notifications(&self, notifications: &[Notification]) -> Result<()>;

    /// Page of a recipient's notifications, newest first.
    fn list_notifications(
        &self,
        recipient: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Notification>>;

    fn count_notifications(&self, recipient: &str) -> Result<usize>;

    fn unread_count(&self, recipient: &str) -> Result<usize>;

    /// Marks one notification read.
    /// Returns None if it doesn't exist or doesn't belong to `recipient`,
    /// otherwise whether it was unread before.
    fn mark_read(&self, notification_id: &str, recipient: &str) -> Result<Option<bool>>;

    /// Returns how many notifications went from unread to read.
    fn mark_all_read(&self, recipient: &str) -> Result<usize>;

    /// Deletes read notifications created before `cutoff` (unix millis).
    fn delete_read_before(&self, cutoff: i64) -> Result<usize>;
}

/// Insertion-ordered notification log kept in memory.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn insert_notifications(&self, notifications: &[Notification]) -> Result<()> {
        self.notifications
            .write()
            .unwrap()
            .extend_from_slice(notifications);
        Ok(())
    }

    fn list_notifications(
        &self,
        recipient: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let notifications = self.notifications.read().unwrap();
        let mut matching: Vec<&Notification> = notifications
            .iter()
            .rev()
            .filter(|n| n.recipient == recipient)
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count_notifications(&self, recipient: &str) -> Result<usize> {
        let notifications = self.notifications.read().unwrap();
        Ok(notifications
            .iter()
            .filter(|n| n.recipient == recipient)
            .count())
    }

    fn unread_count(&self, recipient: &str) -> Result<usize> {
        let notifications = self.notifications.read().unwrap();
        Ok(notifications
            .iter()
            .filter(|n| n.recipient == recipient && !n.read)
            .count())
    }

    fn mark_read(&self, notification_id: &str, recipient: &str) -> Result<Option<bool>> {
        let mut notifications = self.notifications.write().unwrap();
        Ok(notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.recipient == recipient)
            .map(|n| {
                let was_unread = !n.read;
                n.read = true;
                was_unread
            }))
    }

    fn mark_all_read(&self, recipient: &str) -> Result<usize> {
        let mut notifications = self.notifications.write().unwrap();
        let mut updated = 0;
        for n in notifications
            .iter_mut()
            .filter(|n| n.recipient == recipient && !n.read)
        {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    fn delete_read_before(&self, cutoff: i64) -> Result<usize> {
        let mut notifications = self.notifications.write().unwrap();
        let before = notifications.len();
        notifications.retain(|n| !(n.read && n.created_at < cutoff));
        Ok(before - notifications.len())
    }
}
