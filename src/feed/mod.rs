//! Feed and own-posts listings with read-time derived fields.

mod assembler;

pub use assembler::{FeedAssembler, FeedItem, FeedPage, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
