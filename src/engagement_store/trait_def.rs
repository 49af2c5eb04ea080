use super::models::{Comment, NewComment, NewPost, NewUser, Post, PostFilter, ProfileUpdate, User};
use anyhow::Result;

/// Returned (inside `anyhow::Error`) by `create_user` when the handle is in use.
#[derive(Debug, thiserror::Error)]
#[error("handle '{0}' is already taken")]
pub struct HandleTaken(pub String);

/// Data-access boundary for users, posts, comments and their membership sets.
///
/// Membership writes (`set_*`) have set semantics: they bring one identity's
/// membership to the requested state (add-if-absent / remove-if-present) and
/// return the size of the set *after* the write, or `None` when the owning
/// document does not exist. Callers never increment counters themselves.
pub trait EngagementStore: Send + Sync {
    /// Creates a user. Fails with [`HandleTaken`] if the handle is in use.
    fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Applies the present fields of `update`. Returns Ok(None) if the user does not exist.
    fn update_user_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<Option<User>>;

    /// Removes the user document and both sides of every follow edge touching it.
    /// Returns false if the user did not exist.
    fn delete_user(&self, user_id: &str) -> Result<bool>;

    /// Sets whether `follower_id` is in `user_id`'s followers.
    fn set_follower(&self, user_id: &str, follower_id: &str, present: bool)
        -> Result<Option<usize>>;

    /// Sets whether `followee_id` is in `user_id`'s following.
    fn set_following(
        &self,
        user_id: &str,
        followee_id: &str,
        present: bool,
    ) -> Result<Option<usize>>;

    fn create_post(&self, owner_id: &str, new_post: NewPost) -> Result<Post>;

    /// Returns Ok(None) if the post does not exist.
    fn get_post(&self, post_id: &str) -> Result<Option<Post>>;

    /// Returns Ok(None) if the post does not exist.
    fn update_post_caption(&self, post_id: &str, caption: &str) -> Result<Option<Post>>;

    /// Deletes the post with its comments. Returns false if the post did not exist.
    fn delete_post(&self, post_id: &str) -> Result<bool>;

    /// Sets whether `user_id` is in the post's likes.
    fn set_post_like(&self, post_id: &str, user_id: &str, present: bool) -> Result<Option<usize>>;

    fn count_posts(&self, filter: &PostFilter) -> Result<usize>;

    /// Lists matching posts newest first; equal timestamps keep reverse insertion order.
    fn list_posts(&self, filter: &PostFilter, skip: usize, limit: usize) -> Result<Vec<Post>>;

    fn create_comment(&self, new_comment: NewComment) -> Result<Comment>;

    /// Returns Ok(None) if the comment does not exist.
    fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>>;

    /// Returns Ok(None) if the comment does not exist.
    fn update_comment_text(&self, comment_id: &str, text: &str) -> Result<Option<Comment>>;

    /// Deletes the comment and, transitively, its replies.
    /// Returns false if the comment did not exist.
    fn delete_comment(&self, comment_id: &str) -> Result<bool>;

    /// Lists a post's comments oldest first.
    fn list_post_comments(&self, post_id: &str) -> Result<Vec<Comment>>;

    fn count_post_comments(&self, post_id: &str) -> Result<usize>;

    /// Sets whether `user_id` is in the comment's likes.
    fn set_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
        present: bool,
    ) -> Result<Option<usize>>;
}
