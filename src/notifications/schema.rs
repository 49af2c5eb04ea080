//! SQLite schema definitions for the notifications database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

const NOTIFICATIONS_TABLE: Table = Table {
    name: "notifications",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("recipient", &SqlType::Text, non_null = true),
        sqlite_column!("sender", &SqlType::Text),
        sqlite_column!("notification_type", &SqlType::Text, non_null = true),
        sqlite_column!("post_id", &SqlType::Text),
        sqlite_column!("comment_id", &SqlType::Text),
        sqlite_column!("parent_id", &SqlType::Text),
        sqlite_column!(
            "is_read",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_notifications_recipient", "recipient, created_at"),
        ("idx_notifications_read", "is_read, created_at"),
    ],
    unique_constraints: &[],
};

pub const NOTIFICATION_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[NOTIFICATIONS_TABLE],
    migration: None,
}];
