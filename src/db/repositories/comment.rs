//! Comment repository
//!
//! Database operations for comments. Comments are always read in the order
//! they were written.

use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{Comment, CommentWithAuthor};
use crate::with_backend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const SELECT_WITH_AUTHOR: &str = r#"
    SELECT cm.id, cm.text, cm.author_id, cm.post_id, cm.created_at,
           u.username AS author_username,
           p.title AS post_title
    FROM comments cm
    JOIN users u ON u.id = cm.author_id
    JOIN posts p ON p.id = cm.post_id
"#;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Add a comment to a post
    async fn create(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// All comments of a post, oldest first
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// One page of all comments, newest first
    async fn list_recent(&self, offset: i64, limit: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Replace the comment text
    async fn update_text(&self, id: i64, text: &str) -> Result<Comment>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count all comments
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let now = Utc::now();
        let id = with_backend!(self.pool, |p| sqlx::query(
            "INSERT INTO comments (text, author_id, post_id, created_at) VALUES (?, ?, ?, ?)"
        )
        .bind(text)
        .bind(author_id)
        .bind(post_id)
        .bind(now)
        .execute(p)
        .await
        .map(|result| result.inserted_id()))
        .context("Failed to create comment")?;

        Ok(Comment {
            id,
            text: text.to_string(),
            author_id,
            post_id,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        with_backend!(self.pool, |p| sqlx::query_as::<_, Comment>(
            "SELECT id, text, author_id, post_id, created_at FROM comments WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(p)
        .await)
        .context("Failed to get comment by ID")
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let sql = format!(
            "{} WHERE cm.post_id = ? ORDER BY cm.created_at ASC, cm.id ASC",
            SELECT_WITH_AUTHOR
        );
        with_backend!(self.pool, |p| sqlx::query_as::<_, CommentWithAuthor>(&sql)
            .bind(post_id)
            .fetch_all(p)
            .await)
        .context("Failed to list comments for post")
    }

    async fn list_recent(&self, offset: i64, limit: i64) -> Result<Vec<CommentWithAuthor>> {
        let sql = format!(
            "{} ORDER BY cm.created_at DESC, cm.id DESC LIMIT ? OFFSET ?",
            SELECT_WITH_AUTHOR
        );
        with_backend!(self.pool, |p| sqlx::query_as::<_, CommentWithAuthor>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(p)
            .await)
        .context("Failed to list comments")
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<Comment> {
        with_backend!(self.pool, |p| sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
            .bind(text)
            .bind(id)
            .execute(p)
            .await
            .map(|_| ()))
        .context("Failed to update comment")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Comment {} not found after update", id))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_backend!(self.pool, |p| sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .map(|_| ()))
        .context("Failed to delete comment")
    }

    async fn count(&self) -> Result<i64> {
        with_backend!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM comments"
        )
        .fetch_one(p)
        .await)
        .context("Failed to count comments")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        PostRepository, SqlxPostRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{PostInput, User};

    async fn setup() -> (SqlxCommentRepository, SqlxPostRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let author = SqlxUserRepository::new(pool.clone())
            .create(&User::new("reader".into(), String::new(), "hash".into(), false))
            .await
            .unwrap()
            .id;
        let posts = SqlxPostRepository::new(pool.clone());
        let post = posts
            .create(
                author,
                &PostInput {
                    title: "Post".into(),
                    text: "Body".into(),
                    pub_date: Utc::now(),
                    location_id: None,
                    category_id: None,
                    is_published: true,
                },
            )
            .await
            .unwrap()
            .id;
        (SqlxCommentRepository::new(pool), posts, author, post)
    }

    #[tokio::test]
    async fn test_create_and_list_in_order() {
        let (repo, _posts, author, post) = setup().await;

        repo.create(post, author, "first").await.unwrap();
        repo.create(post, author, "second").await.unwrap();
        repo.create(post, author, "third").await.unwrap();

        let comments = repo.list_for_post(post).await.unwrap();
        let texts: Vec<_> = comments.iter().map(|c| c.comment.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(comments[0].author_username, "reader");
        assert_eq!(comments[0].post_title, "Post");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (repo, _posts, author, post) = setup().await;
        let comment = repo.create(post, author, "typo").await.unwrap();

        let updated = repo.update_text(comment.id, "fixed").await.unwrap();
        assert_eq!(updated.text, "fixed");

        repo.delete(comment.id).await.unwrap();
        assert!(repo.get_by_id(comment.id).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_post_delete_removes_comments() {
        let (repo, posts, author, post) = setup().await;
        repo.create(post, author, "bye").await.unwrap();

        posts.delete(post).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let (repo, _posts, author, post) = setup().await;
        repo.create(post, author, "old").await.unwrap();
        repo.create(post, author, "new").await.unwrap();

        let recent = repo.list_recent(0, 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].comment.text, "new");
    }
}
