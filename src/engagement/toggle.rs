//! Like and follow toggles.
//!
//! A toggle reads the current membership, decides the opposite state and
//! writes it with set semantics, so two concurrent toggles by different
//! actors never overwrite each other's membership. Counts always come from
//! the stored sets after the write.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::error::{EngagementError, EngagementResult};
use crate::engagement_store::{EngagementStore, LikeTarget, User};
use crate::server::metrics;

pub const DEFAULT_FOLLOW_REPAIR_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub is_active: bool,
    pub active_count: usize,
}

/// A like toggle together with who owns the liked content, as read right
/// before the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeOutcome {
    pub toggle: LikeToggle,
    pub owner_id: String,
    /// The post itself, or the post a liked comment belongs to.
    pub post_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowToggle {
    pub is_following: bool,
    /// Followers of the followed user.
    pub follower_count: usize,
    /// Users the actor follows.
    pub following_count: usize,
}

pub struct ToggleEngine {
    store: Arc<dyn EngagementStore>,
    follow_repair_attempts: usize,
}

impl ToggleEngine {
    pub fn new(store: Arc<dyn EngagementStore>, follow_repair_attempts: usize) -> Self {
        Self {
            store,
            follow_repair_attempts,
        }
    }

    pub fn toggle_like(
        &self,
        actor: &str,
        target: LikeTarget,
        target_id: &str,
    ) -> EngagementResult<LikeToggle> {
        self.toggle_like_outcome(actor, target, target_id)
            .map(|outcome| outcome.toggle)
    }

    /// Like [`Self::toggle_like`], also reporting the content owner so the
    /// caller never has to re-read the target after the write.
    pub fn toggle_like_outcome(
        &self,
        actor: &str,
        target: LikeTarget,
        target_id: &str,
    ) -> EngagementResult<LikeOutcome> {
        let kind = match target {
            LikeTarget::Post => "post_like",
            LikeTarget::Comment => "comment_like",
        };
        let result = self.flip_like(actor, target, target_id);
        match &result {
            Ok(outcome) => metrics::record_toggle(
                kind,
                if outcome.toggle.is_active { "on" } else { "off" },
            ),
            Err(_) => metrics::record_toggle(kind, "error"),
        }
        result
    }

    fn flip_like(
        &self,
        actor: &str,
        target: LikeTarget,
        target_id: &str,
    ) -> EngagementResult<LikeOutcome> {
        let not_found = || match target {
            LikeTarget::Post => EngagementError::not_found("Post"),
            LikeTarget::Comment => EngagementError::not_found("Comment"),
        };

        let (currently_liked, owner_id, post_id) = match target {
            LikeTarget::Post => self
                .store
                .get_post(target_id)?
                .map(|p| (p.likes.contains(actor), p.owner_id, p.id)),
            LikeTarget::Comment => self
                .store
                .get_comment(target_id)?
                .map(|c| (c.likes.contains(actor), c.owner_id, c.post_id)),
        }
        .ok_or_else(not_found)?;

        let activate = !currently_liked;
        let active_count = match target {
            LikeTarget::Post => self.store.set_post_like(target_id, actor, activate)?,
            LikeTarget::Comment => self.store.set_comment_like(target_id, actor, activate)?,
        }
        // deleted between read and write
        .ok_or_else(not_found)?;

        debug!(
            "{} {} {} by {}: now {}",
            if activate { "Liked" } else { "Unliked" },
            target.as_str(),
            target_id,
            actor,
            active_count
        );
        Ok(LikeOutcome {
            toggle: LikeToggle {
                is_active: activate,
                active_count,
            },
            owner_id,
            post_id,
        })
    }

    pub fn toggle_follow(&self, actor: &str, target: &str) -> EngagementResult<FollowToggle> {
        let result = self.flip_follow(actor, target);
        match &result {
            Ok(toggle) => {
                metrics::record_toggle("follow", if toggle.is_following { "on" } else { "off" })
            }
            Err(_) => metrics::record_toggle("follow", "error"),
        }
        result
    }

    fn load_user(&self, user_id: &str) -> EngagementResult<User> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| EngagementError::not_found("User"))
    }

    fn flip_follow(&self, actor: &str, target: &str) -> EngagementResult<FollowToggle> {
        if actor == target {
            return Err(EngagementError::InvalidInput(
                "You can't follow yourself".to_string(),
            ));
        }
        self.load_user(actor)?;
        let target_user = self.load_user(target)?;

        let follow = !target_user.followers.contains(actor);
        self.store
            .set_follower(target, actor, follow)?
            .ok_or_else(|| EngagementError::not_found("User"))?;
        self.store
            .set_following(actor, target, follow)?
            .ok_or_else(|| EngagementError::not_found("User"))?;

        self.settle_follow(actor, target, follow)
    }

    /// Re-reads both sides of the edge and re-applies the intended state to
    /// whichever side diverges.
    fn settle_follow(
        &self,
        actor: &str,
        target: &str,
        follow: bool,
    ) -> EngagementResult<FollowToggle> {
        let mut attempt = 0;
        loop {
            let actor_user = self.load_user(actor)?;
            let target_user = self.load_user(target)?;
            let followers_ok = target_user.followers.contains(actor) == follow;
            let following_ok = actor_user.following.contains(target) == follow;

            if followers_ok && following_ok {
                return Ok(FollowToggle {
                    is_following: follow,
                    follower_count: target_user.followers.len(),
                    following_count: actor_user.following.len(),
                });
            }
            if attempt == self.follow_repair_attempts {
                warn!(
                    "Follow edge {} -> {} still diverges after {} repairs",
                    actor, target, attempt
                );
                return Err(EngagementError::Conflict(
                    "Follow state could not be settled, try again".to_string(),
                ));
            }

            attempt += 1;
            metrics::record_follow_repair();
            warn!(
                "Repairing follow edge {} -> {} (attempt {})",
                actor, target, attempt
            );
            if !followers_ok {
                self.store.set_follower(target, actor, follow)?;
            }
            if !following_ok {
                self.store.set_following(actor, target, follow)?;
            }
        }
    }
}
