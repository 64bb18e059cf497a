//! Follower graph: a directed edge set over users.
//!
//! An edge `(follower_id, followed_id)` means "follower follows followed".
//! The pair is the primary key, so following twice leaves a single edge.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ensure_user, user_detail, Store, StoreResult};
use crate::models::*;

impl Store {
    pub fn is_following(&self, follower_id: i64, followed_id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        edge_exists(&conn, follower_id, followed_id)
    }

    /// Add the edge if absent. Both users must exist.
    pub fn follow(&self, follower_id: i64, followed_id: i64) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        ensure_user(&tx, follower_id)?;
        ensure_user(&tx, followed_id)?;
        insert_edge(&tx, follower_id, followed_id)?;
        tx.commit()?;
        Ok(())
    }

    /// Remove the edge if present. Missing edges are not an error.
    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        delete_edge(&conn, follower_id, followed_id)
    }

    /// Follow `target_id` on behalf of `user_id` and return the follower.
    pub fn add_follow(&self, user_id: i64, target_id: i64) -> StoreResult<UserDetail> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        ensure_user(&tx, target_id)?;
        let detail = user_detail(&tx, user_id)?;
        insert_edge(&tx, user_id, target_id)?;
        tx.commit()?;
        log::info!("User {} now follows user {}", user_id, target_id);
        Ok(detail)
    }

    /// Unfollow `target_id` on behalf of `user_id` and return the follower.
    pub fn remove_follow(&self, user_id: i64, target_id: i64) -> StoreResult<UserDetail> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        ensure_user(&tx, target_id)?;
        let detail = user_detail(&tx, user_id)?;
        delete_edge(&tx, user_id, target_id)?;
        tx.commit()?;
        log::info!("User {} no longer follows user {}", user_id, target_id);
        Ok(detail)
    }

    /// The user and every user it follows.
    pub fn list_followed(&self, user_id: i64) -> StoreResult<FollowGraphResponse> {
        let conn = self.conn()?;
        neighbourhood(
            &conn,
            "SELECT followed_id FROM followers WHERE follower_id = ?1 ORDER BY followed_id",
            user_id,
        )
    }

    /// The user and every user following it.
    pub fn list_followers(&self, user_id: i64) -> StoreResult<FollowGraphResponse> {
        let conn = self.conn()?;
        neighbourhood(
            &conn,
            "SELECT follower_id FROM followers WHERE followed_id = ?1 ORDER BY follower_id",
            user_id,
        )
    }

    /// Number of edges in the graph
    pub fn count_edges(&self) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM followers", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn edge_exists(conn: &Connection, follower_id: i64, followed_id: i64) -> StoreResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM followers WHERE follower_id = ?1 AND followed_id = ?2",
            params![follower_id, followed_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert_edge(conn: &Connection, follower_id: i64, followed_id: i64) -> StoreResult<()> {
    conn.execute(
        r#"INSERT OR IGNORE INTO followers (follower_id, followed_id, created_at)
           VALUES (?1, ?2, ?3)"#,
        params![follower_id, followed_id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn delete_edge(conn: &Connection, follower_id: i64, followed_id: i64) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM followers WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower_id, followed_id],
    )?;
    Ok(())
}

/// Load `user_id` and the users whose ids `sql` selects for it.
fn neighbourhood(conn: &Connection, sql: &str, user_id: i64) -> StoreResult<FollowGraphResponse> {
    let user = user_detail(conn, user_id)?;

    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;

    let followers = ids
        .into_iter()
        .map(|id| user_detail(conn, id))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(FollowGraphResponse { user, followers })
}
