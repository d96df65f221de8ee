//! Post repository
//!
//! Database operations for posts.
//!
//! Listings are driven by [`PostQuery`]. Every filter field maps to one
//! `(? IS NULL OR ...)` clause, so a single statement serves the home page,
//! category pages, profiles and the admin list. Rows come back joined with
//! their author, category and location and annotated with the comment count,
//! newest `pub_date` first.

use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{CategoryRef, LocationRef, Post, PostDetails, PostInput, PostQuery};
use crate::with_backend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const SELECT_POST: &str = r#"
    SELECT id, title, text, pub_date, author_id, location_id, category_id,
           is_published, created_at
    FROM posts
"#;

const SELECT_DETAILS: &str = r#"
    SELECT p.id, p.title, p.text, p.pub_date, p.author_id, p.location_id,
           p.category_id, p.is_published, p.created_at,
           u.username AS author_username,
           c.title AS category_title,
           c.slug AS category_slug,
           c.is_published AS category_is_published,
           l.name AS location_name,
           l.is_published AS location_is_published,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

const COUNT_FROM: &str = r#"
    SELECT COUNT(*)
    FROM posts p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

// A missing category yields NULL for c.is_published, which fails the
// visibility clause.
const FILTER: &str = r#"
    WHERE (? IS NULL OR p.author_id = ?)
      AND (? IS NULL OR p.category_id = ?)
      AND (? IS NULL OR p.location_id = ?)
      AND (? IS NULL OR (p.is_published = 1 AND c.is_published = 1 AND p.pub_date <= ?))
      AND (? IS NULL OR INSTR(LOWER(p.title), ?) > 0)
      AND (? IS NULL OR p.is_published = ?)
"#;

const ORDER: &str = " ORDER BY p.pub_date DESC, p.title ASC, p.id DESC";

/// Bind the parameters of [`FILTER`], each value twice.
macro_rules! bind_filter {
    ($query:expr, $filter:expr, $needle:expr) => {
        $query
            .bind($filter.author_id)
            .bind($filter.author_id)
            .bind($filter.category_id)
            .bind($filter.category_id)
            .bind($filter.location_id)
            .bind($filter.location_id)
            .bind($filter.visible_at)
            .bind($filter.visible_at)
            .bind($needle.clone())
            .bind($needle.clone())
            .bind($filter.is_published)
            .bind($filter.is_published)
    };
}

/// Flat row of [`SELECT_DETAILS`]
#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    text: String,
    pub_date: DateTime<Utc>,
    author_id: i64,
    location_id: Option<i64>,
    category_id: Option<i64>,
    is_published: bool,
    created_at: DateTime<Utc>,
    author_username: String,
    category_title: Option<String>,
    category_slug: Option<String>,
    category_is_published: Option<bool>,
    location_name: Option<String>,
    location_is_published: Option<bool>,
    comment_count: i64,
}

impl From<PostRow> for PostDetails {
    fn from(row: PostRow) -> Self {
        let category = match (row.category_id, row.category_title, row.category_slug) {
            (Some(id), Some(title), Some(slug)) => Some(CategoryRef {
                id,
                title,
                slug,
                is_published: row.category_is_published.unwrap_or(false),
            }),
            _ => None,
        };
        let location = match (row.location_id, row.location_name) {
            (Some(id), Some(name)) => Some(LocationRef {
                id,
                name,
                is_published: row.location_is_published.unwrap_or(false),
            }),
            _ => None,
        };

        PostDetails {
            post: Post {
                id: row.id,
                title: row.title,
                text: row.text,
                pub_date: row.pub_date,
                author_id: row.author_id,
                location_id: row.location_id,
                category_id: row.category_id,
                is_published: row.is_published,
                created_at: row.created_at,
            },
            author_username: row.author_username,
            category,
            location,
            comment_count: row.comment_count,
        }
    }
}

fn title_needle(query: &PostQuery) -> Option<String> {
    query
        .title_contains
        .as_ref()
        .map(|needle| needle.trim().to_ascii_lowercase())
        .filter(|needle| !needle.is_empty())
}

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a post owned by `author_id`
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post>;

    /// Get the bare post row
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get a post joined with author, category, location and comment count
    async fn get_details(&self, id: i64) -> Result<Option<PostDetails>>;

    /// List one page of posts matching `query`
    async fn list(&self, query: &PostQuery, offset: i64, limit: i64) -> Result<Vec<PostDetails>>;

    /// Count posts matching `query`
    async fn count(&self, query: &PostQuery) -> Result<i64>;

    /// Replace the editable fields of a post. The author is kept.
    async fn update(&self, id: i64, input: &PostInput) -> Result<Post>;

    /// Reassign a post to another user
    async fn set_author(&self, id: i64, author_id: i64) -> Result<()>;

    /// Toggle the published flag
    async fn set_published(&self, id: i64, is_published: bool) -> Result<()>;

    /// Move a post to another category, or out of any
    async fn set_category(&self, id: i64, category_id: Option<i64>) -> Result<()>;

    /// Delete a post together with its comments
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post> {
        let now = Utc::now();
        let id = with_backend!(self.pool, |p| sqlx::query(
            r#"
            INSERT INTO posts (title, text, pub_date, author_id, location_id, category_id,
                               is_published, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.title)
        .bind(&input.text)
        .bind(input.pub_date)
        .bind(author_id)
        .bind(input.location_id)
        .bind(input.category_id)
        .bind(input.is_published)
        .bind(now)
        .execute(p)
        .await
        .map(|result| result.inserted_id()))
        .context("Failed to create post")?;

        Ok(Post {
            id,
            title: input.title.clone(),
            text: input.text.clone(),
            pub_date: input.pub_date,
            author_id,
            location_id: input.location_id,
            category_id: input.category_id,
            is_published: input.is_published,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE id = ?", SELECT_POST);
        with_backend!(self.pool, |p| sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await)
        .context("Failed to get post by ID")
    }

    async fn get_details(&self, id: i64) -> Result<Option<PostDetails>> {
        let sql = format!("{} WHERE p.id = ?", SELECT_DETAILS);
        let row = with_backend!(self.pool, |p| sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await)
        .context("Failed to get post details")?;
        Ok(row.map(PostDetails::from))
    }

    async fn list(&self, query: &PostQuery, offset: i64, limit: i64) -> Result<Vec<PostDetails>> {
        let sql = format!("{}{}{} LIMIT ? OFFSET ?", SELECT_DETAILS, FILTER, ORDER);
        let needle = title_needle(query);
        let rows = with_backend!(self.pool, |p| bind_filter!(
            sqlx::query_as::<_, PostRow>(&sql),
            query,
            needle
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(p)
        .await)
        .context("Failed to list posts")?;
        Ok(rows.into_iter().map(PostDetails::from).collect())
    }

    async fn count(&self, query: &PostQuery) -> Result<i64> {
        let sql = format!("{}{}", COUNT_FROM, FILTER);
        let needle = title_needle(query);
        with_backend!(self.pool, |p| bind_filter!(
            sqlx::query_scalar::<_, i64>(&sql),
            query,
            needle
        )
        .fetch_one(p)
        .await)
        .context("Failed to count posts")
    }

    async fn update(&self, id: i64, input: &PostInput) -> Result<Post> {
        with_backend!(self.pool, |p| sqlx::query(
            r#"
            UPDATE posts
            SET title = ?, text = ?, pub_date = ?, location_id = ?, category_id = ?,
                is_published = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(&input.text)
        .bind(input.pub_date)
        .bind(input.location_id)
        .bind(input.category_id)
        .bind(input.is_published)
        .bind(id)
        .execute(p)
        .await
        .map(|_| ()))
        .context("Failed to update post")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post {} not found after update", id))
    }

    async fn set_author(&self, id: i64, author_id: i64) -> Result<()> {
        with_backend!(self.pool, |p| sqlx::query("UPDATE posts SET author_id = ? WHERE id = ?")
            .bind(author_id)
            .bind(id)
            .execute(p)
            .await
            .map(|_| ()))
        .context("Failed to change post author")
    }

    async fn set_published(&self, id: i64, is_published: bool) -> Result<()> {
        with_backend!(self.pool, |p| sqlx::query(
            "UPDATE posts SET is_published = ? WHERE id = ?"
        )
        .bind(is_published)
        .bind(id)
        .execute(p)
        .await
        .map(|_| ()))
        .context("Failed to change post published flag")
    }

    async fn set_category(&self, id: i64, category_id: Option<i64>) -> Result<()> {
        with_backend!(self.pool, |p| sqlx::query(
            "UPDATE posts SET category_id = ? WHERE id = ?"
        )
        .bind(category_id)
        .bind(id)
        .execute(p)
        .await
        .map(|_| ()))
        .context("Failed to change post category")
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_backend!(self.pool, |p| sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .map(|_| ()))
        .context("Failed to delete post")
    }
}
