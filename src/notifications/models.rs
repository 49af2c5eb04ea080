//! Notification data models

use serde::{Deserialize, Serialize};

use crate::engagement_store::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewPost,
    LikePost,
    CommentPost,
    Follow,
    LikeComment,
    ReplyComment,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::NewPost => "new_post",
            NotificationType::LikePost => "like_post",
            NotificationType::CommentPost => "comment_post",
            NotificationType::Follow => "follow",
            NotificationType::LikeComment => "like_comment",
            NotificationType::ReplyComment => "reply_comment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new_post" => Some(NotificationType::NewPost),
            "like_post" => Some(NotificationType::LikePost),
            "comment_post" => Some(NotificationType::CommentPost),
            "follow" => Some(NotificationType::Follow),
            "like_comment" => Some(NotificationType::LikeComment),
            "reply_comment" => Some(NotificationType::ReplyComment),
            _ => None,
        }
    }
}

/// A triggering action, addressed to one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub recipient: String,
    pub sender: Option<String>,
    pub notification_type: NotificationType,
    pub post: Option<String>,
    pub comment: Option<String>,
    pub parent: Option<String>,
}

impl NotificationEvent {
    pub fn new(
        notification_type: NotificationType,
        recipient: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            sender: Some(sender.into()),
            notification_type,
            post: None,
            comment: None,
            parent: None,
        }
    }

    pub fn with_post(mut self, post_id: impl Into<String>) -> Self {
        self.post = Some(post_id.into());
        self
    }

    pub fn with_comment(mut self, comment_id: impl Into<String>) -> Self {
        self.comment = Some(comment_id.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent = Some(parent_id.into());
        self
    }

    pub fn is_self_addressed(&self) -> bool {
        self.sender.as_deref() == Some(self.recipient.as_str())
    }
}

/// A stored notification. Only `read` ever changes, and only to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient: String,
    pub sender: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub post: Option<String>,
    pub comment: Option<String>,
    pub parent: Option<String>,
    pub read: bool,
    pub created_at: i64,
}

/// Media of the referenced post, for rendering a thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMediaSummary {
    pub id: String,
    pub images: Vec<String>,
    pub video: Option<String>,
}

/// A notification with sender and post references resolved.
///
/// Unresolvable references are left out of the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedNotification {
    pub id: String,
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sender: Option<UserSummary>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post: Option<PostMediaSummary>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent: Option<String>,
    pub read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<EnrichedNotification>,
    pub total: usize,
    pub unread_count: usize,
}

/// Result of a bulk fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Events dropped because sender and recipient are the same.
    pub suppressed: usize,
    pub persisted: usize,
    /// Recipients with at least one live connection that received the event.
    pub delivered: usize,
    /// Recipients whose enrichment or delivery failed.
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadOutcome {
    pub updated_count: usize,
    pub unread_count: usize,
}
