//! SQLite schema definitions for the engagement database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, SqlType, Table, VersionedSchema};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
    cascade_on_delete: true,
};

const POST_FK: ForeignKey = ForeignKey {
    foreign_table: "posts",
    foreign_column: "id",
    cascade_on_delete: true,
};

const COMMENT_FK: ForeignKey = ForeignKey {
    foreign_table: "comments",
    foreign_column: "id",
    cascade_on_delete: true,
};

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("handle", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("avatar", &SqlType::Text),
        sqlite_column!("bio", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["handle"]],
};

/// One row per edge: both the follower's `following` and the followee's
/// `followers` are read from here.
const FOLLOWS_TABLE: Table = Table {
    name: "follows",
    columns: &[
        sqlite_column!(
            "follower_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!(
            "followee_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_follows_followee", "followee_id")],
    unique_constraints: &[&["follower_id", "followee_id"]],
};

const POSTS_TABLE: Table = Table {
    name: "posts",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "owner_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("caption", &SqlType::Text, non_null = true),
        sqlite_column!("images", &SqlType::Text, non_null = true), // JSON array
        sqlite_column!("video", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_posts_owner", "owner_id"),
        ("idx_posts_created", "created_at"),
    ],
    unique_constraints: &[],
};

const POST_LIKES_TABLE: Table = Table {
    name: "post_likes",
    columns: &[
        sqlite_column!(
            "post_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&POST_FK)
        ),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["post_id", "user_id"]],
};

const COMMENTS_TABLE: Table = Table {
    name: "comments",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "post_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&POST_FK)
        ),
        sqlite_column!("owner_id", &SqlType::Text, non_null = true),
        sqlite_column!("text", &SqlType::Text, non_null = true),
        sqlite_column!("parent_id", &SqlType::Text, foreign_key = Some(&COMMENT_FK)),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_comments_post", "post_id")],
    unique_constraints: &[],
};

const COMMENT_LIKES_TABLE: Table = Table {
    name: "comment_likes",
    columns: &[
        sqlite_column!(
            "comment_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&COMMENT_FK)
        ),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["comment_id", "user_id"]],
};

pub const ENGAGEMENT_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USERS_TABLE,
        FOLLOWS_TABLE,
        POSTS_TABLE,
        POST_LIKES_TABLE,
        COMMENTS_TABLE,
        COMMENT_LIKES_TABLE,
    ],
    migration: None,
}];
