//! SQLite-backed engagement store implementation.

use super::membership::MembershipSet;
use super::models::{
    generate_id, now_millis, Comment, NewComment, NewPost, NewUser, Post, PostFilter,
    ProfileUpdate, User,
};
use super::schema::ENGAGEMENT_VERSIONED_SCHEMAS;
use super::trait_def::{EngagementStore, HandleTaken};
use crate::sqlite_persistence::{open_versioned, sql_bound};
use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// SQLite-backed engagement store.
///
/// A follow is a single `follows` row, so both sides of the edge change in one
/// statement and can never diverge.
#[derive(Clone)]
pub struct SqliteEngagementStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEngagementStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).with_context(|| {
            format!(
                "Failed to open engagement database {}",
                db_path.as_ref().display()
            )
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on engagement database")?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let conn = open_versioned(conn, ENGAGEMENT_VERSIONED_SCHEMAS)?;
        let users: usize = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        let posts: usize = conn.query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0))?;
        info!("Engagement store ready: {} users, {} posts", users, posts);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn parse_images(json: String) -> Vec<String> {
    serde_json::from_str(&json).unwrap_or_else(|e| {
        warn!("Malformed images array in engagement db: {}: {}", json, e);
        Vec::new()
    })
}

fn load_members(conn: &Connection, sql: &str, id: &str) -> Result<MembershipSet> {
    let mut stmt = conn.prepare_cached(sql)?;
    let members = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(members.into_iter().collect())
}

fn load_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, handle, name, avatar, bio, created_at FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    handle: row.get(1)?,
                    name: row.get(2)?,
                    avatar: row.get(3)?,
                    bio: row.get(4)?,
                    followers: MembershipSet::new(),
                    following: MembershipSet::new(),
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()?;
    let Some(mut user) = user else {
        return Ok(None);
    };
    user.followers = load_members(
        conn,
        "SELECT follower_id FROM follows WHERE followee_id = ?1 ORDER BY rowid",
        user_id,
    )?;
    user.following = load_members(
        conn,
        "SELECT followee_id FROM follows WHERE follower_id = ?1 ORDER BY rowid",
        user_id,
    )?;
    Ok(Some(user))
}

const POST_COLUMNS: &str = "id, owner_id, caption, images, video, created_at, updated_at";

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        caption: row.get(2)?,
        images: parse_images(row.get(3)?),
        video: row.get(4)?,
        likes: MembershipSet::new(),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn with_post_likes(conn: &Connection, mut post: Post) -> Result<Post> {
    post.likes = load_members(
        conn,
        "SELECT user_id FROM post_likes WHERE post_id = ?1 ORDER BY rowid",
        &post.id,
    )?;
    Ok(post)
}

fn load_post(conn: &Connection, post_id: &str) -> Result<Option<Post>> {
    let post = conn
        .query_row(
            &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
            params![post_id],
            post_from_row,
        )
        .optional()?;
    post.map(|p| with_post_likes(conn, p)).transpose()
}

const COMMENT_COLUMNS: &str = "id, post_id, owner_id, text, parent_id, created_at, updated_at";

fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        owner_id: row.get(2)?,
        text: row.get(3)?,
        parent_id: row.get(4)?,
        likes: MembershipSet::new(),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn with_comment_likes(conn: &Connection, mut comment: Comment) -> Result<Comment> {
    comment.likes = load_members(
        conn,
        "SELECT user_id FROM comment_likes WHERE comment_id = ?1 ORDER BY rowid",
        &comment.id,
    )?;
    Ok(comment)
}

fn load_comment(conn: &Connection, comment_id: &str) -> Result<Option<Comment>> {
    let comment = conn
        .query_row(
            &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
            params![comment_id],
            comment_from_row,
        )
        .optional()?;
    comment.map(|c| with_comment_likes(conn, c)).transpose()
}

fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    Ok(conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", table),
            params![id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

/// Builds the WHERE clause and its parameters for a post filter.
fn filter_clause(filter: &PostFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    if let Some(owner) = &filter.exclude_owner {
        values.push(Value::Text(owner.clone()));
        conditions.push(format!("owner_id != ?{}", values.len()));
    }
    if let Some(owners) = &filter.only_owners {
        if owners.is_empty() {
            conditions.push("0".to_string());
        } else {
            let placeholders: Vec<String> = owners
                .iter()
                .map(|owner| {
                    values.push(Value::Text(owner.clone()));
                    format!("?{}", values.len())
                })
                .collect();
            conditions.push(format!("owner_id IN ({})", placeholders.join(", ")));
        }
    }
    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), values)
    }
}

/// Applies a set-semantics membership write to a (parent, user) table and
/// returns the resulting set size.
fn set_membership(
    conn: &Connection,
    table: &str,
    parent_column: &str,
    parent_id: &str,
    user_column: &str,
    user_id: &str,
    present: bool,
) -> Result<usize> {
    if present {
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} ({}, {}, created_at) VALUES (?1, ?2, ?3)",
                table, parent_column, user_column
            ),
            params![parent_id, user_id, now_millis()],
        )?;
    } else {
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
                table, parent_column, user_column
            ),
            params![parent_id, user_id],
        )?;
    }
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", table, parent_column),
        params![parent_id],
        |r| r.get(0),
    )?;
    Ok(count)
}

impl EngagementStore for SqliteEngagementStore {
    fn create_user(&self, new_user: NewUser) -> Result<User> {
        let conn = self.conn.lock().unwrap();
        let taken = conn
            .query_row(
                "SELECT 1 FROM users WHERE handle = ?1",
                params![new_user.handle],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if taken {
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
        conn.execute(
            "INSERT INTO users (id, handle, name, avatar, bio, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.handle,
                user.name,
                user.avatar,
                user.bio,
                user.created_at
            ],
        )
        .context("Failed to insert user")?;
        Ok(user)
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        load_user(&conn, user_id)
    }

    fn update_user_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE users SET
                name = COALESCE(?2, name),
                bio = COALESCE(?3, bio),
                avatar = COALESCE(?4, avatar)
             WHERE id = ?1",
            params![user_id, update.name, update.bio, update.avatar],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        load_user(&conn, user_id)
    }

    fn delete_user(&self, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        Ok(deleted > 0)
    }

    fn set_follower(
        &self,
        user_id: &str,
        follower_id: &str,
        present: bool,
    ) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        if !exists(&conn, "users", user_id)? {
            return Ok(None);
        }
        let count = set_membership(
            &conn,
            "follows",
            "followee_id",
            user_id,
            "follower_id",
            follower_id,
            present,
        )?;
        Ok(Some(count))
    }

    fn set_following(
        &self,
        user_id: &str,
        followee_id: &str,
        present: bool,
    ) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        if !exists(&conn, "users", user_id)? {
            return Ok(None);
        }
        let count = set_membership(
            &conn,
            "follows",
            "follower_id",
            user_id,
            "followee_id",
            followee_id,
            present,
        )?;
        Ok(Some(count))
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
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO posts (id, owner_id, caption, images, video, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                post.id,
                post.owner_id,
                post.caption,
                serde_json::to_string(&post.images)?,
                post.video,
                post.created_at,
                post.updated_at
            ],
        )
        .context("Failed to insert post")?;
        Ok(post)
    }

    fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let conn = self.conn.lock().unwrap();
        load_post(&conn, post_id)
    }

    fn update_post_caption(&self, post_id: &str, caption: &str) -> Result<Option<Post>> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE posts SET caption = ?2, updated_at = ?3 WHERE id = ?1",
            params![post_id, caption, now_millis()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        load_post(&conn, post_id)
    }

    fn delete_post(&self, post_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
        Ok(deleted > 0)
    }

    fn set_post_like(&self, post_id: &str, user_id: &str, present: bool) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        if !exists(&conn, "posts", post_id)? {
            return Ok(None);
        }
        let count = set_membership(
            &conn,
            "post_likes",
            "post_id",
            post_id,
            "user_id",
            user_id,
            present,
        )?;
        Ok(Some(count))
    }

    fn count_posts(&self, filter: &PostFilter) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let (clause, values) = filter_clause(filter);
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM posts {}", clause),
            params_from_iter(values),
            |r| r.get(0),
        )?;
        Ok(count)
    }

    fn list_posts(&self, filter: &PostFilter, skip: usize, limit: usize) -> Result<Vec<Post>> {
        let conn = self.conn.lock().unwrap();
        let (clause, mut values) = filter_clause(filter);
        values.push(Value::Integer(sql_bound(limit)));
        let limit_param = values.len();
        values.push(Value::Integer(sql_bound(skip)));
        let offset_param = values.len();
        let sql = format!(
            "SELECT {} FROM posts {} ORDER BY created_at DESC, rowid DESC LIMIT ?{} OFFSET ?{}",
            POST_COLUMNS, clause, limit_param, offset_param
        );
        let posts = {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values), post_from_row)?
                .collect::<rusqlite::Result<Vec<Post>>>()?;
            rows
        };
        posts
            .into_iter()
            .map(|p| with_post_likes(&conn, p))
            .collect()
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
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO comments (id, post_id, owner_id, text, parent_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                comment.id,
                comment.post_id,
                comment.owner_id,
                comment.text,
                comment.parent_id,
                comment.created_at,
                comment.updated_at
            ],
        )
        .context("Failed to insert comment")?;
        Ok(comment)
    }

    fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        let conn = self.conn.lock().unwrap();
        load_comment(&conn, comment_id)
    }

    fn update_comment_text(&self, comment_id: &str, text: &str) -> Result<Option<Comment>> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE comments SET text = ?2, updated_at = ?3 WHERE id = ?1",
            params![comment_id, text, now_millis()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        load_comment(&conn, comment_id)
    }

    fn delete_comment(&self, comment_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        // Replies go with it through the parent_id cascade.
        let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
        Ok(deleted > 0)
    }

    fn list_post_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        let comments = {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {} FROM comments WHERE post_id = ?1 ORDER BY created_at ASC, rowid ASC",
                COMMENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![post_id], comment_from_row)?
                .collect::<rusqlite::Result<Vec<Comment>>>()?;
            rows
        };
        comments
            .into_iter()
            .map(|c| with_comment_likes(&conn, c))
            .collect()
    }

    fn count_post_comments(&self, post_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
            params![post_id],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    fn set_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
        present: bool,
    ) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        if !exists(&conn, "comments", comment_id)? {
            return Ok(None);
        }
        let count = set_membership(
            &conn,
            "comment_likes",
            "comment_id",
            comment_id,
            "user_id",
            user_id,
            present,
        )?;
        Ok(Some(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteEngagementStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteEngagementStore::new(dir.path().join("engagement.db")).unwrap();
        (store, dir)
    }

    fn new_user(store: &SqliteEngagementStore, handle: &str) -> User {
        store
            .create_user(NewUser {
                handle: handle.to_string(),
                name: handle.to_uppercase(),
                avatar: Some(format!("https://cdn.example/{}.png", handle)),
                bio: None,
            })
            .unwrap()
    }

    #[test]
    fn user_round_trips_through_db() {
        let (store, _dir) = create_tmp_store();
        let alice = new_user(&store, "alice");
        assert_eq!(store.get_user(&alice.id).unwrap(), Some(alice.clone()));

        let updated = store
            .update_user_profile(
                &alice.id,
                ProfileUpdate {
                    bio: Some("hello".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        assert_eq!(updated.name, "ALICE");
    }

    #[test]
    fn rejects_duplicate_handle() {
        let (store, _dir) = create_tmp_store();
        new_user(&store, "alice");
        let err = store
            .create_user(NewUser {
                handle: "alice".to_string(),
                name: "Again".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.downcast_ref::<HandleTaken>().is_some());
    }

    #[test]
    fn follow_edge_is_visible_from_both_sides() {
        let (store, _dir) = create_tmp_store();
        let alice = new_user(&store, "alice");
        let bob = new_user(&store, "bob");

        assert_eq!(store.set_follower(&bob.id, &alice.id, true).unwrap(), Some(1));
        assert_eq!(store.set_following(&alice.id, &bob.id, true).unwrap(), Some(1));

        let alice = store.get_user(&alice.id).unwrap().unwrap();
        let bob = store.get_user(&bob.id).unwrap().unwrap();
        assert!(alice.following.contains(&bob.id));
        assert!(bob.followers.contains(&alice.id));

        assert_eq!(store.set_following(&alice.id, &bob.id, false).unwrap(), Some(0));
        let bob = store.get_user(&bob.id).unwrap().unwrap();
        assert!(bob.followers.is_empty());
        assert_eq!(store.set_follower("missing", &alice.id, true).unwrap(), None);
    }

    #[test]
    fn post_likes_have_set_semantics() {
        let (store, _dir) = create_tmp_store();
        let alice = new_user(&store, "alice");
        let post = store
            .create_post(
                &alice.id,
                NewPost {
                    caption: "sunset".to_string(),
                    images: vec!["a.jpg".to_string(), "b.jpg".to_string()],
                    video: None,
                },
            )
            .unwrap();

        assert_eq!(store.set_post_like(&post.id, "u1", true).unwrap(), Some(1));
        assert_eq!(store.set_post_like(&post.id, "u1", true).unwrap(), Some(1));
        assert_eq!(store.set_post_like(&post.id, "u2", true).unwrap(), Some(2));
        assert_eq!(store.set_post_like(&post.id, "u2", false).unwrap(), Some(1));

        let loaded = store.get_post(&post.id).unwrap().unwrap();
        assert_eq!(loaded.images, post.images);
        assert_eq!(loaded.likes.as_slice(), &["u1".to_string()]);
    }

    #[test]
    fn list_posts_applies_filter_and_order() {
        let (store, _dir) = create_tmp_store();
        let alice = new_user(&store, "alice");
        let bob = new_user(&store, "bob");
        let first = store.create_post(&bob.id, NewPost::default()).unwrap();
        store.create_post(&alice.id, NewPost::default()).unwrap();
        let second = store.create_post(&bob.id, NewPost::default()).unwrap();

        let filter = PostFilter {
            exclude_owner: Some(alice.id.clone()),
            only_owners: None,
        };
        assert_eq!(store.count_posts(&filter).unwrap(), 2);
        let ids: Vec<String> = store
            .list_posts(&filter, 0, 10)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let nobody = PostFilter {
            exclude_owner: None,
            only_owners: Some(vec![]),
        };
        assert_eq!(store.count_posts(&nobody).unwrap(), 0);
    }

    #[test]
    fn huge_offset_lists_no_posts() {
        let (store, _dir) = create_tmp_store();
        let alice = new_user(&store, "alice");
        store.create_post(&alice.id, NewPost::default()).unwrap();

        let filter = PostFilter::default();
        assert!(store.list_posts(&filter, usize::MAX, 10).unwrap().is_empty());
        assert_eq!(store.list_posts(&filter, 0, usize::MAX).unwrap().len(), 1);
    }

    #[test]
    fn deleting_post_cascades_to_comments_and_replies() {
        let (store, _dir) = create_tmp_store();
        let alice = new_user(&store, "alice");
        let post = store.create_post(&alice.id, NewPost::default()).unwrap();
        let root = store
            .create_comment(NewComment {
                post_id: post.id.clone(),
                owner_id: alice.id.clone(),
                text: "first".to_string(),
                parent_id: None,
            })
            .unwrap();
        let reply = store
            .create_comment(NewComment {
                post_id: post.id.clone(),
                owner_id: alice.id.clone(),
                text: "reply".to_string(),
                parent_id: Some(root.id.clone()),
            })
            .unwrap();
        store.set_comment_like(&reply.id, "u1", true).unwrap();

        assert!(store.delete_comment(&root.id).unwrap());
        assert!(store.get_comment(&reply.id).unwrap().is_none());

        store
            .create_comment(NewComment {
                post_id: post.id.clone(),
                owner_id: alice.id.clone(),
                text: "again".to_string(),
                parent_id: None,
            })
            .unwrap();
        assert!(store.delete_post(&post.id).unwrap());
        assert_eq!(store.count_post_comments(&post.id).unwrap(), 0);
    }

    #[test]
    fn reopening_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engagement.db");
        let alice_id = {
            let store = SqliteEngagementStore::new(&path).unwrap();
            new_user(&store, "alice").id
        };
        let store = SqliteEngagementStore::new(&path).unwrap();
        assert!(store.get_user(&alice_id).unwrap().is_some());
    }
}
