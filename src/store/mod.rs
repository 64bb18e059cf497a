use rusqlite::{ffi, params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::models::*;

mod follows;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thread-safe SQLite store
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store for testing
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        // Cascades below only fire with foreign keys enabled on this connection.
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message TEXT UNIQUE NOT NULL,
                user_id INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS followers (
                follower_id INTEGER NOT NULL,
                followed_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (follower_id, followed_id),
                FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (followed_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_posts_user_id ON posts(user_id);
            CREATE INDEX IF NOT EXISTS idx_followers_followed_id ON followers(followed_id);
            "#,
        )?;
        Ok(())
    }

    // ==================== User Operations ====================

    pub fn create_user(&self, username: &str, email: &str) -> StoreResult<User> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (username, email) VALUES (?1, ?2)",
            params![username, email],
        )
        .map_err(|e| conflict_or_database(e, "username or email already exists"))?;

        let user = User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
        };
        log::info!("Created user {} ({})", user.id, user.username);
        Ok(user)
    }

    pub fn get_user(&self, id: i64) -> StoreResult<User> {
        let conn = self.conn()?;
        user_by_id(&conn, id)
    }

    /// The user with its posts materialized
    pub fn get_user_detail(&self, id: i64) -> StoreResult<UserDetail> {
        let conn = self.conn()?;
        user_detail(&conn, id)
    }

    pub fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT username, email FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], |row| {
                Ok(UserSummary {
                    username: row.get("username")?,
                    email: row.get("email")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Apply the given fields to an existing user. Absent fields are kept.
    pub fn update_user(
        &self,
        id: i64,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<UserDetail> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut user = user_by_id(&tx, id)?;
        if let Some(username) = username {
            user.username = username.to_string();
        }
        if let Some(email) = email {
            user.email = email.to_string();
        }

        tx.execute(
            "UPDATE users SET username = ?1, email = ?2 WHERE id = ?3",
            params![&user.username, &user.email, user.id],
        )
        .map_err(|e| conflict_or_database(e, "username or email already exists"))?;

        let detail = UserDetail::new(user, posts_for_user(&tx, id)?);
        tx.commit()?;
        Ok(detail)
    }

    /// Delete a user. Posts and follow edges go with it.
    pub fn delete_user(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("User {}", id)));
        }
        log::info!("Deleted user {}", id);
        Ok(())
    }

    pub fn count_users(&self) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==================== Post Operations ====================

    pub fn create_post(&self, user_id: i64, message: &str) -> StoreResult<Post> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        ensure_user(&tx, user_id)?;
        tx.execute(
            "INSERT INTO posts (message, user_id) VALUES (?1, ?2)",
            params![message, user_id],
        )
        .map_err(|e| conflict_or_database(e, "post message already exists"))?;

        let post = Post {
            id: tx.last_insert_rowid(),
            message: message.to_string(),
            user_id,
        };
        tx.commit()?;
        log::info!("Created post {} for user {}", post.id, user_id);
        Ok(post)
    }

    pub fn get_post(&self, id: i64) -> StoreResult<Post> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, message, user_id FROM posts WHERE id = ?1",
            params![id],
            row_to_post,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(format!("Post {}", id)),
            _ => StoreError::Database(e),
        })
    }

    pub fn list_posts(&self) -> StoreResult<Vec<PostView>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT p.id, p.message, u.username
               FROM posts p
               JOIN users u ON u.id = p.user_id
               ORDER BY p.id"#,
        )?;
        let posts = stmt
            .query_map([], row_to_post_view)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(posts)
    }

    /// Posts of one user. An existing user without posts yields an empty list.
    pub fn list_posts_by_user(&self, user_id: i64) -> StoreResult<Vec<PostView>> {
        let conn = self.conn()?;
        ensure_user(&conn, user_id)?;

        let mut stmt = conn.prepare(
            r#"SELECT p.id, p.message, u.username
               FROM posts p
               JOIN users u ON u.id = p.user_id
               WHERE p.user_id = ?1
               ORDER BY p.id"#,
        )?;
        let posts = stmt
            .query_map(params![user_id], row_to_post_view)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(posts)
    }
}

// ==================== Row Helpers ====================

fn user_by_id(conn: &Connection, id: i64) -> StoreResult<User> {
    conn.query_row(
        "SELECT id, username, email FROM users WHERE id = ?1",
        params![id],
        row_to_user,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(format!("User {}", id)),
        _ => StoreError::Database(e),
    })
}

fn ensure_user(conn: &Connection, id: i64) -> StoreResult<()> {
    let exists = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    match exists {
        Some(()) => Ok(()),
        None => Err(StoreError::NotFound(format!("User {}", id))),
    }
}

fn user_detail(conn: &Connection, id: i64) -> StoreResult<UserDetail> {
    let user = user_by_id(conn, id)?;
    let posts = posts_for_user(conn, id)?;
    Ok(UserDetail::new(user, posts))
}

fn posts_for_user(conn: &Connection, user_id: i64) -> StoreResult<Vec<Post>> {
    let mut stmt =
        conn.prepare("SELECT id, message, user_id FROM posts WHERE user_id = ?1 ORDER BY id")?;
    let posts = stmt
        .query_map(params![user_id], row_to_post)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(posts)
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
    })
}

fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get("id")?,
        message: row.get("message")?,
        user_id: row.get("user_id")?,
    })
}

fn row_to_post_view(row: &rusqlite::Row) -> rusqlite::Result<PostView> {
    Ok(PostView {
        id: row.get("id")?,
        message: row.get("message")?,
        username: row.get("username")?,
    })
}

/// Unique and primary-key violations become `Conflict`, everything else stays a database error.
fn conflict_or_database(e: rusqlite::Error, what: &str) -> StoreError {
    let is_conflict = matches!(
        &e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    );
    if is_conflict {
        log::warn!("Constraint violation: {}", what);
        StoreError::Conflict(what.to_string())
    } else {
        StoreError::Database(e)
    }
}
