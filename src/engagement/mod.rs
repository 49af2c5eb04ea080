//! Engagement actions and the like/follow toggles behind them.

mod error;
mod manager;
mod toggle;
mod validation;

pub use error::{EngagementError, EngagementResult};
pub use manager::{EngagementManager, UserProfile};
pub use toggle::{
    FollowToggle, LikeOutcome, LikeToggle, ToggleEngine, DEFAULT_FOLLOW_REPAIR_ATTEMPTS,
};
pub use validation::{validate_comment_text, validate_handle, MAX_COMMENT_LENGTH};
