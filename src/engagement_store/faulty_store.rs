//! Store wrapper that injects write anomalies, for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::Result;

use super::memory_store::InMemoryEngagementStore;
use super::models::{Comment, NewComment, NewPost, NewUser, Post, PostFilter, ProfileUpdate, User};
use super::trait_def::EngagementStore;

/// Delegates to an [`InMemoryEngagementStore`], with two anomalies:
/// - the first `dropped_following_writes` writes to a `following` side are
///   silently lost;
/// - with `vanish_after_like` set, a post or comment is deleted right after
///   a like is added to it, as a concurrent delete would.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryEngagementStore,
    pub dropped_following_writes: AtomicUsize,
    pub vanish_after_like: AtomicBool,
}

impl FaultyStore {
    pub fn dropping_following_writes(count: usize) -> Self {
        Self {
            dropped_following_writes: AtomicUsize::new(count),
            ..Default::default()
        }
    }

    pub fn vanishing_after_like() -> Self {
        Self {
            vanish_after_like: AtomicBool::new(true),
            ..Default::default()
        }
    }
}

impl EngagementStore for FaultyStore {
    fn create_user(&self, new_user: NewUser) -> Result<User> {
        self.inner.create_user(new_user)
    }
    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.inner.get_user(user_id)
    }
    fn update_user_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<Option<User>> {
        self.inner.update_user_profile(user_id, update)
    }
    fn delete_user(&self, user_id: &str) -> Result<bool> {
        self.inner.delete_user(user_id)
    }
    fn set_follower(
        &self,
        user_id: &str,
        follower_id: &str,
        present: bool,
    ) -> Result<Option<usize>> {
        self.inner.set_follower(user_id, follower_id, present)
    }
    fn set_following(
        &self,
        user_id: &str,
        followee_id: &str,
        present: bool,
    ) -> Result<Option<usize>> {
        let dropped = self
            .dropped_following_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            let current = self.inner.get_user(user_id)?;
            return Ok(current.map(|u| u.following.len()));
        }
        self.inner.set_following(user_id, followee_id, present)
    }
    fn create_post(&self, owner_id: &str, new_post: NewPost) -> Result<Post> {
        self.inner.create_post(owner_id, new_post)
    }
    fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        self.inner.get_post(post_id)
    }
    fn update_post_caption(&self, post_id: &str, caption: &str) -> Result<Option<Post>> {
        self.inner.update_post_caption(post_id, caption)
    }
    fn delete_post(&self, post_id: &str) -> Result<bool> {
        self.inner.delete_post(post_id)
    }
    fn set_post_like(&self, post_id: &str, user_id: &str, present: bool) -> Result<Option<usize>> {
        let count = self.inner.set_post_like(post_id, user_id, present)?;
        if present && count.is_some() && self.vanish_after_like.load(Ordering::SeqCst) {
            self.inner.delete_post(post_id)?;
        }
        Ok(count)
    }
    fn count_posts(&self, filter: &PostFilter) -> Result<usize> {
        self.inner.count_posts(filter)
    }
    fn list_posts(&self, filter: &PostFilter, skip: usize, limit: usize) -> Result<Vec<Post>> {
        self.inner.list_posts(filter, skip, limit)
    }
    fn create_comment(&self, new_comment: NewComment) -> Result<Comment> {
        self.inner.create_comment(new_comment)
    }
    fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        self.inner.get_comment(comment_id)
    }
    fn update_comment_text(&self, comment_id: &str, text: &str) -> Result<Option<Comment>> {
        self.inner.update_comment_text(comment_id, text)
    }
    fn delete_comment(&self, comment_id: &str) -> Result<bool> {
        self.inner.delete_comment(comment_id)
    }
    fn list_post_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        self.inner.list_post_comments(post_id)
    }
    fn count_post_comments(&self, post_id: &str) -> Result<usize> {
        self.inner.count_post_comments(post_id)
    }
    fn set_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
        present: bool,
    ) -> Result<Option<usize>> {
        let count = self.inner.set_comment_like(comment_id, user_id, present)?;
        if present && count.is_some() && self.vanish_after_like.load(Ordering::SeqCst) {
            self.inner.delete_comment(comment_id)?;
        }
        Ok(count)
    }
}
