//! Category repository
//!
//! Database operations for categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{Category, CategoryInput};
use crate::with_backend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const SELECT_CATEGORY: &str =
    "SELECT id, title, description, slug, is_published, created_at FROM categories";

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, input: &CategoryInput) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories ordered by title
    async fn list(&self) -> Result<Vec<Category>>;

    /// Replace every editable field of a category
    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category>;

    /// Delete a category. Its posts keep existing without a category.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a category slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Count all categories
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CategoryInput) -> Result<Category> {
        let now = Utc::now();
        let id = with_backend!(self.pool, |p| sqlx::query(
            r#"
            INSERT INTO categories (title, description, slug, is_published, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.slug)
        .bind(input.is_published)
        .bind(now)
        .execute(p)
        .await
        .map(|result| result.inserted_id()))
        .context("Failed to create category")?;

        Ok(Category {
            id,
            title: input.title.clone(),
            description: input.description.clone(),
            slug: input.slug.clone(),
            is_published: input.is_published,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("{} WHERE id = ?", SELECT_CATEGORY);
        with_backend!(self.pool, |p| sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await)
        .context("Failed to get category by ID")
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let sql = format!("{} WHERE slug = ?", SELECT_CATEGORY);
        with_backend!(self.pool, |p| sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(p)
            .await)
        .context("Failed to get category by slug")
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!("{} ORDER BY title, id", SELECT_CATEGORY);
        with_backend!(self.pool, |p| sqlx::query_as::<_, Category>(&sql)
            .fetch_all(p)
            .await)
        .context("Failed to list categories")
    }

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category> {
        with_backend!(self.pool, |p| sqlx::query(
            r#"
            UPDATE categories
            SET title = ?, description = ?, slug = ?, is_published = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.slug)
        .bind(input.is_published)
        .bind(id)
        .execute(p)
        .await
        .map(|_| ()))
        .context("Failed to update category")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category {} not found after update", id))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_backend!(self.pool, |p| sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .map(|_| ()))
        .context("Failed to delete category")
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let count = with_backend!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM categories WHERE slug = ?"
        )
        .bind(slug)
        .fetch_one(p)
        .await)
        .context("Failed to check category slug")?;
        Ok(count > 0)
    }

    async fn count(&self) -> Result<i64> {
        with_backend!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM categories"
        )
        .fetch_one(p)
        .await)
        .context("Failed to count categories")
    }
}
