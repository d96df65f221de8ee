//! User repository
//!
//! Database operations for user accounts.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{UpdateProfileInput, User};
use crate::with_backend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const SELECT_USER: &str = r#"
    SELECT id, username, email, first_name, last_name, password_hash, is_staff,
           created_at, updated_at
    FROM users
"#;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// List all users ordered by username
    async fn list(&self) -> Result<Vec<User>>;

    /// Replace the editable profile fields
    async fn update_profile(&self, id: i64, input: &UpdateProfileInput) -> Result<User>;

    /// Check if a username is already taken
    async fn exists_by_username(&self, username: &str) -> Result<bool>;

    /// Count all users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let id = with_backend!(self.pool, |p| sqlx::query(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash,
                               is_staff, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(now)
        .bind(now)
        .execute(p)
        .await
        .map(|result| result.inserted_id()))
        .context("Failed to create user")?;

        Ok(User {
            id,
            created_at: now,
            updated_at: now,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("{} WHERE id = ?", SELECT_USER);
        with_backend!(self.pool, |p| sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await)
        .context("Failed to get user by ID")
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("{} WHERE username = ?", SELECT_USER);
        with_backend!(self.pool, |p| sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(p)
            .await)
        .context("Failed to get user by username")
    }

    async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("{} ORDER BY username", SELECT_USER);
        with_backend!(self.pool, |p| sqlx::query_as::<_, User>(&sql)
            .fetch_all(p)
            .await)
        .context("Failed to list users")
    }

    async fn update_profile(&self, id: i64, input: &UpdateProfileInput) -> Result<User> {
        with_backend!(self.pool, |p| sqlx::query(
            r#"
            UPDATE users
            SET first_name = ?, last_name = ?, username = ?, email = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.username)
        .bind(&input.email)
        .bind(Utc::now())
        .bind(id)
        .execute(p)
        .await
        .map(|_| ()))
        .context("Failed to update user profile")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} not found after update", id))
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool> {
        let count: i64 = with_backend!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE username = ?"
        )
        .bind(username)
        .fetch_one(p)
        .await)
        .context("Failed to check username")?;
        Ok(count > 0)
    }

    async fn count(&self) -> Result<i64> {
        with_backend!(self.pool, |p| sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(p)
            .await)
        .context("Failed to count users")
    }
}
