//! In-memory engagement store, used by `--in-memory` and by tests.

use super::membership::MembershipSet;
use super::models::{
    generate_id, now_millis, Comment, NewComment, NewPost, NewUser, Post, PostFilter,
    ProfileUpdate, User,
};
use super::trait_def::{EngagementStore, HandleTaken};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    /// handle -> user id
    handles: HashMap<String, String>,
    posts: HashMap<String, Post>,
    post_order: Vec<String>,
    comments: HashMap<String, Comment>,
    comment_order: Vec<String>,
}

/// Keeps every document in process memory.
///
/// The two sides of a follow edge are stored on the two user documents and
/// written independently, exactly like a document database would.
#[derive(Default)]
pub struct InMemoryEngagementStore {
    inner: RwLock<Inner>,
}

impl InMemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn comment_subtree(&self, root_id: &str) -> HashSet<String> {
        let mut doomed: HashSet<String> = HashSet::from([root_id.to_string()]);
        loop {
            let before = doomed.len();
            for comment in self.comments.values() {
                if let Some(parent) = &comment.parent_id {
                    if doomed.contains(parent) {
                        doomed.insert(comment.id.clone());
                    }
                }
            }
            if doomed.len() == before {
                return doomed;
            }
        }
    }

    fn remove_comments(&mut self, doomed: &HashSet<String>) {
        self.comments.retain(|id, _| !doomed.contains(id));
        self.comment_order.retain(|id| !doomed.contains(id));
    }
}

impl EngagementStore for InMemoryEngagementStore {
    fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut inner = self.inner.write().unwrap();
        if inner.handles.contains_key(&new_user.handle) {
            return Err(HandleTaken(new_user.handle).into());
        }
        let user = User {
            id: generate_id(),
            handle: new_user.handle,
            name: new_user.name,
            avatar: new_user.avatar,
            bio: new_user.bio,
            followers: MembershipSet::new(),
            following: MembershipSet::new(),
            created_at: now_millis(),
        };
        inner.handles.insert(user.handle.clone(), user.id.clone());
        inner.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.inner.read().unwrap().users.get(user_id).cloned())
    }

    fn update_user_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<Option<User>> {
        let mut inner = self.inner.write().unwrap();
        let Some(user) = inner.users.get_mut(user_id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(bio) = update.bio {
            user.bio = Some(bio);
        }
        if let Some(avatar) = update.avatar {
            user.avatar = Some(avatar);
        }
        Ok(Some(user.clone()))
    }

    fn delete_user(&self, user_id: &str) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        let Some(user) = inner.users.remove(user_id) else {
            return Ok(false);
        };
        inner.handles.remove(&user.handle);
        for other in inner.users.values_mut() {
            other.followers.remove(user_id);
            other.following.remove(user_id);
        }
        Ok(true)
    }

    fn set_follower(
        &self,
        user_id: &str,
        follower_id: &str,
        present: bool,
    ) -> Result<Option<usize>> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.users.get_mut(user_id).map(|user| {
            user.followers.set(follower_id, present);
            user.followers.len()
        }))
    }

    fn set_following(
        &self,
        user_id: &str,
        followee_id: &str,
        present: bool,
    ) -> Result<Option<usize>> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.users.get_mut(user_id).map(|user| {
            user.following.set(followee_id, present);
            user.following.len()
        }))
    }

    fn create_post(&self, owner_id: &str, new_post: NewPost) -> Result<Post> {
        let now = now_millis();
        let post = Post {
            id: generate_id(),
            owner_id: owner_id.to_string(),
            caption: new_post.caption,
            images: new_post.images,
            video: new_post.video,
            likes: MembershipSet::new(),
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.write().unwrap();
        inner.post_order.push(post.id.clone());
        inner.posts.insert(post.id.clone(), post.clone());
        Ok(post)
    }

    fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        Ok(self.inner.read().unwrap().posts.get(post_id).cloned())
    }

    fn update_post_caption(&self, post_id: &str, caption: &str) -> Result<Option<Post>> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.posts.get_mut(post_id).map(|post| {
            post.caption = caption.to_string();
            post.updated_at = now_millis();
            post.clone()
        }))
    }

    fn delete_post(&self, post_id: &str) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        if inner.posts.remove(post_id).is_none() {
            return Ok(false);
        }
        inner.post_order.retain(|id| id != post_id);
        let doomed: HashSet<String> = inner
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.id.clone())
            .collect();
        inner.remove_comments(&doomed);
        Ok(true)
    }

    fn set_post_like(&self, post_id: &str, user_id: &str, present: bool) -> Result<Option<usize>> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.posts.get_mut(post_id).map(|post| {
            post.likes.set(user_id, present);
            post.likes.len()
        }))
    }

    fn count_posts(&self, filter: &PostFilter) -> Result<usize> {
        let inner = self.inner.read().unwrap();
        Ok(inner.posts.values().filter(|p| filter.matches(p)).count())
    }

    fn list_posts(&self, filter: &PostFilter, skip: usize, limit: usize) -> Result<Vec<Post>> {
        let inner = self.inner.read().unwrap();
        // Newest inserted first, then a stable sort keeps that order among equal timestamps.
        let mut matching: Vec<&Post> = inner
            .post_order
            .iter()
            .rev()
            .filter_map(|id| inner.posts.get(id))
            .filter(|p| filter.matches(p))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    fn create_comment(&self, new_comment: NewComment) -> Result<Comment> {
        let now = now_millis();
        let comment = Comment {
            id: generate_id(),
            post_id: new_comment.post_id,
            owner_id: new_comment.owner_id,
            text: new_comment.text,
            parent_id: new_comment.parent_id,
            likes: MembershipSet::new(),
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.write().unwrap();
        inner.comment_order.push(comment.id.clone());
        inner.comments.insert(comment.id.clone(), comment.clone());
        Ok(comment)
    }

    fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        Ok(self.inner.read().unwrap().comments.get(comment_id).cloned())
    }

    fn update_comment_text(&self, comment_id: &str, text: &str) -> Result<Option<Comment>> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.comments.get_mut(comment_id).map(|comment| {
            comment.text = text.to_string();
            comment.updated_at = now_millis();
            comment.clone()
        }))
    }

    fn delete_comment(&self, comment_id: &str) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        if !inner.comments.contains_key(comment_id) {
            return Ok(false);
        }
        let doomed = inner.comment_subtree(comment_id);
        inner.remove_comments(&doomed);
        Ok(true)
    }

    fn list_post_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let inner = self.inner.read().unwrap();
        let mut comments: Vec<Comment> = inner
            .comment_order
            .iter()
            .filter_map(|id| inner.comments.get(id))
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    fn count_post_comments(&self, post_id: &str) -> Result<usize> {
        let inner = self.inner.read().unwrap();
        Ok(inner.comments.values().filter(|c| c.post_id == post_id).count())
    }

    fn set_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
        present: bool,
    ) -> Result<Option<usize>> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.comments.get_mut(comment_id).map(|comment| {
            comment.likes.set(user_id, present);
            comment.likes.len()
        }))
    }
}
