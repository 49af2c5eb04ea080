//! Notification service for creating, enriching and delivering notifications

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::models::{
    BulkOutcome, EnrichedNotification, MarkAllReadOutcome, Notification, NotificationEvent,
    NotificationPage, PostMediaSummary,
};
use super::store::NotificationStore;
use crate::engagement::{EngagementError, EngagementResult};
use crate::engagement_store::{generate_id, now_millis, EngagementStore};
use crate::server::metrics;
use crate::server::websocket::messages::{msg_types, notification::UnreadCountMessage};
use crate::server::websocket::RealtimeBroker;

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 50;

/// Creates notifications from triggering actions and pushes them to the
/// recipient's room.
///
/// Delivery is best-effort: an offline recipient or a detached broker never
/// fails an operation once the notification is persisted.
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    engagement_store: Arc<dyn EngagementStore>,
    broker: Arc<dyn RealtimeBroker>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        engagement_store: Arc<dyn EngagementStore>,
        broker: Arc<dyn RealtimeBroker>,
    ) -> Self {
        Self {
            store,
            engagement_store,
            broker,
        }
    }

    fn compose(event: NotificationEvent, created_at: i64) -> Notification {
        Notification {
            id: generate_id(),
            recipient: event.recipient,
            sender: event.sender,
            notification_type: event.notification_type,
            post: event.post,
            comment: event.comment,
            parent: event.parent,
            read: false,
            created_at,
        }
    }

    /// Creates a notification for a single recipient and pushes it.
    ///
    /// Returns `None` when the event addresses its own sender.
    pub async fn notify(&self, event: NotificationEvent) -> Result<Option<Notification>> {
        if event.is_self_addressed() {
            metrics::record_notification(event.notification_type.as_str(), "suppressed");
            return Ok(None);
        }

        let notification = Self::compose(event, now_millis());
        self.store
            .insert_notifications(std::slice::from_ref(&notification))?;
        metrics::record_notification(notification.notification_type.as_str(), "persisted");

        let delivered = match self.enrich(&notification) {
            Ok(enriched) => self.deliver(&enriched).await,
            Err(err) => Err(err),
        };
        if let Err(err) = delivered {
            metrics::record_notification(notification.notification_type.as_str(), "failed");
            warn!(
                "Notification {} stored but not pushed: {:#}",
                notification.id, err
            );
        }

        Ok(Some(notification))
    }

    /// Fans a batch of events out: one persistence write, then enrichment and
    /// delivery per recipient. A failure for one recipient is logged and does
    /// not affect the others.
    pub async fn notify_bulk(&self, events: Vec<NotificationEvent>) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        let created_at = now_millis();
        let notifications: Vec<Notification> = events
            .into_iter()
            .filter(|event| {
                if event.is_self_addressed() {
                    metrics::record_notification(event.notification_type.as_str(), "suppressed");
                    outcome.suppressed += 1;
                    false
                } else {
                    true
                }
            })
            .map(|event| Self::compose(event, created_at))
            .collect();

        if notifications.is_empty() {
            return Ok(outcome);
        }

        self.store.insert_notifications(&notifications)?;
        outcome.persisted = notifications.len();

        for notification in &notifications {
            let kind = notification.notification_type.as_str();
            metrics::record_notification(kind, "persisted");
            let delivered = match self.enrich(notification) {
                Ok(enriched) => self.deliver(&enriched).await,
                Err(err) => Err(err),
            };
            match delivered {
                Ok(0) => {}
                Ok(_) => outcome.delivered += 1,
                Err(err) => {
                    outcome.failed += 1;
                    metrics::record_notification(kind, "failed");
                    warn!(
                        "Failed to push {} notification to {}: {:#}",
                        kind, notification.recipient, err
                    );
                }
            }
        }

        debug!(
            "Bulk notify: {} persisted, {} delivered, {} failed, {} suppressed",
            outcome.persisted, outcome.delivered, outcome.failed, outcome.suppressed
        );
        Ok(outcome)
    }

    /// Resolves sender and post references. Missing documents become absent
    /// fields; only storage failures are errors.
    pub fn enrich(&self, notification: &Notification) -> Result<EnrichedNotification> {
        let sender = match &notification.sender {
            Some(sender_id) => self
                .engagement_store
                .get_user(sender_id)?
                .map(|user| user.summary()),
            None => None,
        };
        let post = match &notification.post {
            Some(post_id) => self
                .engagement_store
                .get_post(post_id)?
                .map(|post| PostMediaSummary {
                    id: post.id,
                    images: post.images,
                    video: post.video,
                }),
            None => None,
        };
        Ok(EnrichedNotification {
            id: notification.id.clone(),
            recipient: notification.recipient.clone(),
            sender,
            notification_type: notification.notification_type,
            post,
            comment: notification.comment.clone(),
            parent: notification.parent.clone(),
            read: notification.read,
            created_at: notification.created_at,
        })
    }

    /// Serializes `payload` and hands it to the recipient's room.
    async fn emit<T: Serialize>(&self, recipient: &str, event: &str, payload: &T) -> Result<usize> {
        let payload = serde_json::to_value(payload)
            .with_context(|| format!("Failed to encode {} payload", event))?;
        Ok(self.broker.emit_to_user(recipient, event, payload).await?)
    }

    async fn deliver(&self, enriched: &EnrichedNotification) -> Result<usize> {
        let delivered = self
            .emit(&enriched.recipient, msg_types::NOTIFICATION_NEW, enriched)
            .await?;
        if delivered > 0 {
            metrics::record_notification(enriched.notification_type.as_str(), "delivered");
        } else {
            debug!(
                "No live connection for {}, notification {} stays stored",
                enriched.recipient, enriched.id
            );
        }
        Ok(delivered)
    }

    async fn push_unread_count(&self, recipient: &str, unread_count: usize) {
        if let Err(err) = self
            .emit(recipient, msg_types::UNREAD_COUNT, &UnreadCountMessage { unread_count })
            .await
        {
            debug!("Unread count for {} not pushed: {:#}", recipient, err);
        }
    }

    /// Page of the recipient's notifications, newest first.
    ///
    /// `limit` defaults to [`DEFAULT_PAGE_LIMIT`] and is capped at [`MAX_PAGE_LIMIT`].
    pub fn list(
        &self,
        recipient: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> EngagementResult<NotificationPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let notifications = self
            .store
            .list_notifications(recipient, skip, limit)?
            .iter()
            .map(|n| self.enrich(n))
            .collect::<Result<Vec<_>>>()?;
        Ok(NotificationPage {
            notifications,
            total: self.store.count_notifications(recipient)?,
            unread_count: self.store.unread_count(recipient)?,
        })
    }

    pub fn unread_count(&self, recipient: &str) -> EngagementResult<usize> {
        Ok(self.store.unread_count(recipient)?)
    }

    /// Marks one notification read and returns the recipient's unread count.
    ///
    /// Marking an already-read notification is a no-op. A notification that
    /// doesn't exist or belongs to someone else is `NotFound`.
    pub async fn mark_read(&self, recipient: &str, notification_id: &str) -> EngagementResult<usize> {
        let changed = self
            .store
            .mark_read(notification_id, recipient)?
            .ok_or_else(|| EngagementError::not_found("Notification"))?;
        let unread_count = self.store.unread_count(recipient)?;
        if changed {
            self.push_unread_count(recipient, unread_count).await;
        }
        Ok(unread_count)
    }

    pub async fn mark_all_read(&self, recipient: &str) -> EngagementResult<MarkAllReadOutcome> {
        let updated_count = self.store.mark_all_read(recipient)?;
        let unread_count = self.store.unread_count(recipient)?;
        if updated_count > 0 {
            self.push_unread_count(recipient, unread_count).await;
        }
        Ok(MarkAllReadOutcome {
            updated_count,
            unread_count,
        })
    }

    /// Deletes read notifications older than `retention`.
    pub fn prune_read_older_than(&self, retention: Duration) -> Result<usize> {
        let cutoff = now_millis() - retention.as_millis() as i64;
        let deleted = self.store.delete_read_before(cutoff)?;
        if deleted > 0 {
            info!("Pruned {} read notifications", deleted);
        }
        Ok(deleted)
    }
}
