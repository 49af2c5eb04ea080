use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::engagement::{EngagementError, EngagementResult};
use crate::engagement_store::{EngagementStore, Post, PostFilter, UserSummary};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 50;

/// A post with its read-time derived fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub owner: UserSummary,
    pub caption: String,
    pub images: Vec<String>,
    pub video: Option<String>,
    pub like_count: usize,
    pub is_liked_by_viewer: bool,
    pub comment_count: usize,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

pub struct FeedAssembler {
    store: Arc<dyn EngagementStore>,
    max_page_size: usize,
}

impl FeedAssembler {
    pub fn new(store: Arc<dyn EngagementStore>, max_page_size: usize) -> Self {
        Self {
            store,
            max_page_size: max_page_size.max(1),
        }
    }

    /// Posts by other users, newest first. Restricted to followed authors
    /// once the viewer follows anyone.
    pub fn assemble_feed(
        &self,
        viewer: &str,
        page: usize,
        page_size: usize,
    ) -> EngagementResult<FeedPage> {
        let viewer_user = self
            .store
            .get_user(viewer)?
            .ok_or_else(|| EngagementError::not_found("User"))?;
        let only_owners = if viewer_user.following.is_empty() {
            None
        } else {
            Some(viewer_user.following.as_slice().to_vec())
        };
        let filter = PostFilter {
            exclude_owner: Some(viewer.to_string()),
            only_owners,
        };
        self.assemble(viewer, &filter, page, page_size)
    }

    /// The viewer's own posts, newest first.
    pub fn assemble_own_posts(
        &self,
        viewer: &str,
        page: usize,
        page_size: usize,
    ) -> EngagementResult<FeedPage> {
        self.assemble(viewer, &PostFilter::owned_by(viewer), page, page_size)
    }

    fn assemble(
        &self,
        viewer: &str,
        filter: &PostFilter,
        page: usize,
        page_size: usize,
    ) -> EngagementResult<FeedPage> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, self.max_page_size);

        let total_items = self.store.count_posts(filter)?;
        let total_pages = total_items.div_ceil(page_size);
        let posts = self
            .store
            .list_posts(filter, (page - 1).saturating_mul(page_size), page_size)?;

        let mut owners: HashMap<String, Option<UserSummary>> = HashMap::new();
        let mut items = Vec::with_capacity(posts.len());
        for post in posts {
            let owner = match owners.get(&post.owner_id) {
                Some(cached) => cached.clone(),
                None => {
                    let resolved = self.store.get_user(&post.owner_id)?.map(|u| u.summary());
                    owners.insert(post.owner_id.clone(), resolved.clone());
                    resolved
                }
            };
            let Some(owner) = owner else {
                debug!("Dropping post {} with unresolvable owner", post.id);
                continue;
            };
            let comment_count = self.store.count_post_comments(&post.id)?;
            items.push(Self::item(post, owner, viewer, comment_count));
        }

        Ok(FeedPage {
            items,
            total_items,
            total_pages,
            has_more: page < total_pages,
        })
    }

    fn item(post: Post, owner: UserSummary, viewer: &str, comment_count: usize) -> FeedItem {
        FeedItem {
            like_count: post.likes.len(),
            is_liked_by_viewer: post.likes.contains(viewer),
            comment_count,
            id: post.id,
            owner,
            caption: post.caption,
            images: post.images,
            video: post.video,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}
