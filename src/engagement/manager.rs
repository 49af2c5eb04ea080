//! Engagement actions: users, posts and comments.
//!
//! Every mutation commits to the store first. Notification work is only
//! submitted to the dispatcher afterwards and never affects the result
//! returned to the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::error::{EngagementError, EngagementResult};
use super::toggle::{FollowToggle, LikeToggle, ToggleEngine};
use super::validation::{validate_comment_text, validate_handle};
use crate::engagement_store::{
    Comment, EngagementStore, HandleTaken, LikeTarget, NewComment, NewPost, NewUser, Post,
    ProfileUpdate, User,
};
use crate::notifications::{
    NotificationDispatcher, NotificationEvent, NotificationJob, NotificationType,
};

/// A user as seen by themselves: profile fields plus follow counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub handle: String,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub follower_count: usize,
    pub following_count: usize,
    pub created_at: i64,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            follower_count: user.followers.len(),
            following_count: user.following.len(),
            id: user.id,
            handle: user.handle,
            name: user.name,
            avatar: user.avatar,
            bio: user.bio,
            created_at: user.created_at,
        }
    }
}

pub struct EngagementManager {
    store: Arc<dyn EngagementStore>,
    toggles: ToggleEngine,
    dispatcher: NotificationDispatcher,
}

impl EngagementManager {
    pub fn new(
        store: Arc<dyn EngagementStore>,
        dispatcher: NotificationDispatcher,
        follow_repair_attempts: usize,
    ) -> Self {
        Self {
            toggles: ToggleEngine::new(store.clone(), follow_repair_attempts),
            store,
            dispatcher,
        }
    }

    fn dispatch(&self, job: NotificationJob) {
        // The dispatcher logs and counts rejected jobs itself.
        let _ = self.dispatcher.submit(job);
    }

    fn load_user(&self, user_id: &str) -> EngagementResult<User> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| EngagementError::not_found("User"))
    }

    fn load_post(&self, post_id: &str) -> EngagementResult<Post> {
        self.store
            .get_post(post_id)?
            .ok_or_else(|| EngagementError::not_found("Post"))
    }

    fn load_comment(&self, comment_id: &str) -> EngagementResult<Comment> {
        self.store
            .get_comment(comment_id)?
            .ok_or_else(|| EngagementError::not_found("Comment"))
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub fn create_user(&self, mut new_user: NewUser) -> EngagementResult<UserProfile> {
        new_user.handle = new_user.handle.trim().to_string();
        new_user.name = new_user.name.trim().to_string();
        validate_handle(&new_user.handle)?;
        if new_user.name.is_empty() {
            new_user.name = new_user.handle.clone();
        }

        match self.store.create_user(new_user) {
            Ok(user) => {
                info!("Created user {} (@{})", user.id, user.handle);
                Ok(user.into())
            }
            Err(err) => match err.downcast_ref::<HandleTaken>() {
                Some(taken) => Err(EngagementError::Conflict(taken.to_string())),
                None => Err(err.into()),
            },
        }
    }

    pub fn get_profile(&self, user_id: &str) -> EngagementResult<UserProfile> {
        Ok(self.load_user(user_id)?.into())
    }

    pub fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> EngagementResult<UserProfile> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(EngagementError::InvalidInput(
                    "Name must not be empty".to_string(),
                ));
            }
        }
        self.store
            .update_user_profile(user_id, update)?
            .map(UserProfile::from)
            .ok_or_else(|| EngagementError::not_found("User"))
    }

    pub fn toggle_follow(&self, actor: &str, target: &str) -> EngagementResult<FollowToggle> {
        let toggle = self.toggles.toggle_follow(actor, target)?;
        if toggle.is_following {
            self.dispatch(NotificationJob::Single(NotificationEvent::new(
                NotificationType::Follow,
                target,
                actor,
            )));
        }
        Ok(toggle)
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    pub fn create_post(&self, actor: &str, new_post: NewPost) -> EngagementResult<Post> {
        self.load_user(actor)?;
        let post = self.store.create_post(actor, new_post)?;
        debug!("User {} created post {}", actor, post.id);
        self.dispatch(NotificationJob::NewPostFanOut {
            author: actor.to_string(),
            post: post.id.clone(),
        });
        Ok(post)
    }

    fn owned_post(&self, actor: &str, post_id: &str, action: &str) -> EngagementResult<Post> {
        let post = self.load_post(post_id)?;
        if post.owner_id != actor {
            return Err(EngagementError::Unauthorized(format!(
                "Not authorized to {} this post",
                action
            )));
        }
        Ok(post)
    }

    pub fn edit_post(&self, actor: &str, post_id: &str, caption: &str) -> EngagementResult<Post> {
        self.owned_post(actor, post_id, "edit")?;
        self.store
            .update_post_caption(post_id, caption)?
            .ok_or_else(|| EngagementError::not_found("Post"))
    }

    pub fn delete_post(&self, actor: &str, post_id: &str) -> EngagementResult<()> {
        self.owned_post(actor, post_id, "delete")?;
        if !self.store.delete_post(post_id)? {
            return Err(EngagementError::not_found("Post"));
        }
        debug!("User {} deleted post {}", actor, post_id);
        Ok(())
    }

    pub fn toggle_post_like(&self, actor: &str, post_id: &str) -> EngagementResult<LikeToggle> {
        let outcome = self
            .toggles
            .toggle_like_outcome(actor, LikeTarget::Post, post_id)?;
        if outcome.toggle.is_active {
            self.dispatch(NotificationJob::Single(
                NotificationEvent::new(NotificationType::LikePost, outcome.owner_id, actor)
                    .with_post(outcome.post_id),
            ));
        }
        Ok(outcome.toggle)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Adds a comment to a post, or a reply when `parent_id` is given.
    pub fn create_comment(
        &self,
        actor: &str,
        post_id: &str,
        text: &str,
        parent_id: Option<&str>,
    ) -> EngagementResult<Comment> {
        let text = validate_comment_text(text)?;
        let post = self.load_post(post_id)?;
        let parent = match parent_id {
            Some(parent_id) => {
                let parent = self.load_comment(parent_id)?;
                if parent.post_id != post.id {
                    return Err(EngagementError::InvalidInput(
                        "Parent comment belongs to a different post".to_string(),
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let comment = self.store.create_comment(NewComment {
            post_id: post.id.clone(),
            owner_id: actor.to_string(),
            text,
            parent_id: parent.as_ref().map(|p| p.id.clone()),
        })?;

        let comment_on_post =
            NotificationEvent::new(NotificationType::CommentPost, &post.owner_id, actor)
                .with_post(&post.id)
                .with_comment(&comment.id);
        match parent {
            None => self.dispatch(NotificationJob::Single(comment_on_post)),
            Some(parent) => {
                let mut events = vec![NotificationEvent::new(
                    NotificationType::ReplyComment,
                    &parent.owner_id,
                    actor,
                )
                .with_post(&post.id)
                .with_comment(&comment.id)
                .with_parent(&parent.id)];
                if parent.owner_id != post.owner_id {
                    events.push(comment_on_post);
                }
                self.dispatch(NotificationJob::Bulk(events));
            }
        }

        Ok(comment)
    }

    /// Oldest first.
    pub fn list_comments(&self, post_id: &str) -> EngagementResult<Vec<Comment>> {
        self.load_post(post_id)?;
        Ok(self.store.list_post_comments(post_id)?)
    }

    fn owned_comment(&self, actor: &str, comment_id: &str) -> EngagementResult<Comment> {
        let comment = self.load_comment(comment_id)?;
        if comment.owner_id != actor {
            return Err(EngagementError::Unauthorized("Not authorized".to_string()));
        }
        Ok(comment)
    }

    pub fn edit_comment(
        &self,
        actor: &str,
        comment_id: &str,
        text: &str,
    ) -> EngagementResult<Comment> {
        let text = validate_comment_text(text)?;
        self.owned_comment(actor, comment_id)?;
        self.store
            .update_comment_text(comment_id, &text)?
            .ok_or_else(|| EngagementError::not_found("Comment"))
    }

    pub fn delete_comment(&self, actor: &str, comment_id: &str) -> EngagementResult<()> {
        self.owned_comment(actor, comment_id)?;
        if !self.store.delete_comment(comment_id)? {
            return Err(EngagementError::not_found("Comment"));
        }
        Ok(())
    }

    pub fn toggle_comment_like(
        &self,
        actor: &str,
        comment_id: &str,
    ) -> EngagementResult<LikeToggle> {
        let outcome = self
            .toggles
            .toggle_like_outcome(actor, LikeTarget::Comment, comment_id)?;
        if outcome.toggle.is_active {
            self.dispatch(NotificationJob::Single(
                NotificationEvent::new(NotificationType::LikeComment, outcome.owner_id, actor)
                    .with_post(outcome.post_id)
                    .with_comment(comment_id),
            ));
        }
        Ok(outcome.toggle)
    }
}
