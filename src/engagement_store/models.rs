//! Engagement data models

use serde::{Deserialize, Serialize};

use super::membership::MembershipSet;

/// Current time as unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub handle: String,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub followers: MembershipSet,
    pub following: MembershipSet,
    pub created_at: i64,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            handle: self.handle.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Denormalized view of a user, embedded in feed items and notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub handle: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub owner_id: String,
    pub caption: String,
    pub images: Vec<String>,
    pub video: Option<String>,
    pub likes: MembershipSet,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub video: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub owner_id: String,
    pub text: String,
    pub parent_id: Option<String>,
    pub likes: MembershipSet,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A validated comment, ready to be stored.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: String,
    pub owner_id: String,
    pub text: String,
    pub parent_id: Option<String>,
}

/// What a like toggles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeTarget {
    Post,
    Comment,
}

impl LikeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeTarget::Post => "post",
            LikeTarget::Comment => "comment",
        }
    }
}

/// Which posts a listing selects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    /// Posts by this owner are never selected.
    pub exclude_owner: Option<String>,
    /// When set, only posts by these owners are selected.
    pub only_owners: Option<Vec<String>>,
}

impl PostFilter {
    pub fn owned_by(owner_id: &str) -> Self {
        Self {
            exclude_owner: None,
            only_owners: Some(vec![owner_id.to_string()]),
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        if self.exclude_owner.as_deref() == Some(post.owner_id.as_str()) {
            return false;
        }
        match &self.only_owners {
            Some(owners) => owners.iter().any(|o| o == &post.owner_id),
            None => true,
        }
    }
}
