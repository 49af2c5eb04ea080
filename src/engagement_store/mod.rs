#[cfg(test)]
mod faulty_store;
mod membership;
mod memory_store;
mod models;
mod schema;
mod sqlite_store;
mod trait_def;

#[cfg(test)]
pub(crate) use faulty_store::FaultyStore;
pub use membership::MembershipSet;
pub use memory_store::InMemoryEngagementStore;
pub use models::{
    generate_id, now_millis, Comment, LikeTarget, NewComment, NewPost, NewUser, Post, PostFilter,
    ProfileUpdate, User, UserSummary,
};
pub use sqlite_store::SqliteEngagementStore;
pub use trait_def::{EngagementStore, HandleTaken};
