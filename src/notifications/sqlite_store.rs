//! SQLite-backed notification store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

use super::models::{Notification, NotificationType};
use super::schema::NOTIFICATION_VERSIONED_SCHEMAS;
use super::store::NotificationStore;
use crate::sqlite_persistence::{open_versioned, sql_bound};

#[derive(Clone)]
pub struct SqliteNotificationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteNotificationStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).with_context(|| {
            format!(
                "Failed to open notifications database {}",
                db_path.as_ref().display()
            )
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on notifications database")?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let conn = open_versioned(conn, NOTIFICATION_VERSIONED_SCHEMAS)?;
        let unread: usize = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE is_read = 0",
            [],
            |r| r.get(0),
        )?;
        info!("Notification store ready: {} unread notifications", unread);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, recipient, sender, notification_type, post_id, comment_id, parent_id, is_read, created_at";

/// Rows whose type is unknown to this build are skipped by the caller.
fn notification_from_row(row: &Row) -> rusqlite::Result<Option<Notification>> {
    let type_str: String = row.get(3)?;
    let Some(notification_type) = NotificationType::parse(&type_str) else {
        warn!("Unknown notification type in db: {}", type_str);
        return Ok(None);
    };
    Ok(Some(Notification {
        id: row.get(0)?,
        recipient: row.get(1)?,
        sender: row.get(2)?,
        notification_type,
        post: row.get(4)?,
        comment: row.get(5)?,
        parent: row.get(6)?,
        read: row.get::<_, i32>(7)? != 0,
        created_at: row.get(8)?,
    }))
}

impl NotificationStore for SqliteNotificationStore {
    fn insert_notifications(&self, notifications: &[Notification]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO notifications ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                NOTIFICATION_COLUMNS
            ))?;
            for n in notifications {
                stmt.execute(params![
                    n.id,
                    n.recipient,
                    n.sender,
                    n.notification_type.as_str(),
                    n.post,
                    n.comment,
                    n.parent,
                    n.read as i32,
                    n.created_at
                ])?;
            }
        }
        tx.commit().context("Failed to commit notification batch")?;
        Ok(())
    }

    fn list_notifications(
        &self,
        recipient: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM notifications WHERE recipient = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
            NOTIFICATION_COLUMNS
        ))?;
        let rows = stmt
            .query_map(
                params![recipient, sql_bound(limit), sql_bound(skip)],
                notification_from_row,
            )?
            .collect::<rusqlite::Result<Vec<Option<Notification>>>>()?;
        Ok(rows.into_iter().flatten().collect())
    }

    fn count_notifications(&self, recipient: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient = ?1",
            params![recipient],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    fn unread_count(&self, recipient: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient = ?1 AND is_read = 0",
            params![recipient],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    fn mark_read(&self, notification_id: &str, recipient: &str) -> Result<Option<bool>> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE notifications SET is_read = 1
             WHERE id = ?1 AND recipient = ?2 AND is_read = 0",
            params![notification_id, recipient],
        )?;
        if updated > 0 {
            return Ok(Some(true));
        }
        let exists = conn
            .query_row(
                "SELECT 1 FROM notifications WHERE id = ?1 AND recipient = ?2",
                params![notification_id, recipient],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(exists.then_some(false))
    }

    fn mark_all_read(&self, recipient: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE recipient = ?1 AND is_read = 0",
            params![recipient],
        )?;
        Ok(updated)
    }

    fn delete_read_before(&self, cutoff: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM notifications WHERE is_read = 1 AND created_at < ?1",
            params![cutoff],
        )?;
        Ok(deleted)
    }
}
