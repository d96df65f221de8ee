//! Session repository
//!
//! Database operations for login sessions.

use crate::db::DynDatabasePool;
use crate::models::Session;
use crate::with_backend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a user
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        with_backend!(self.pool, |p| sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)"
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(p)
        .await
        .map(|_| ()))
        .context("Failed to create session")?;

        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        with_backend!(self.pool, |p| sqlx::query_as::<_, Session>(
            "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(p)
        .await)
        .context("Failed to get session by ID")
    }

    async fn delete(&self, id: &str) -> Result<()> {
        with_backend!(self.pool, |p| sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .map(|_| ()))
        .context("Failed to delete session")
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        with_backend!(self.pool, |p| sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(p)
            .await
            .map(|_| ()))
        .context("Failed to delete user sessions")
    }

    async fn delete_expired(&self) -> Result<u64> {
        with_backend!(self.pool, |p| sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(p)
            .await
            .map(|result| result.rows_affected()))
        .context("Failed to delete expired sessions")
    }
}
