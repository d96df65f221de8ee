//! Comment service
//!
//! Adding, editing and deleting comments under a post. A comment is always
//! addressed through its post; a comment id that belongs to another post is
//! treated as missing.

use crate::db::repositories::CommentRepository;
use crate::models::{Comment, CommentWithAuthor, ListParams, PagedResult, User};
use crate::services::visibility::is_author;
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Comment not found")]
    NotFound,

    /// Viewer is not the author of the comment
    #[error("Comment {0} belongs to another user")]
    NotAuthor(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    per_page: u32,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, per_page: u32) -> Self {
        Self { comments, per_page }
    }

    /// Comments of a post, oldest first
    pub async fn list_for_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        Ok(self
            .comments
            .list_for_post(post_id)
            .await
            .context("Failed to list comments")?)
    }

    /// Add a comment. The caller has already checked that `author` may see
    /// the post.
    pub async fn add(
        &self,
        post_id: i64,
        author: &User,
        text: &str,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self
            .comments
            .create(post_id, author.id, text)
            .await
            .context("Failed to create comment")?;
        tracing::debug!(comment_id = comment.id, post_id, "Comment added");
        Ok(comment)
    }

    /// The comment `comment_id` under `post_id`, regardless of author
    pub async fn get(&self, post_id: i64, comment_id: i64) -> Result<Comment, CommentServiceError> {
        self.comments
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .filter(|comment| comment.post_id == post_id)
            .ok_or(CommentServiceError::NotFound)
    }

    /// The comment, if `viewer` wrote it
    pub async fn get_owned(
        &self,
        post_id: i64,
        comment_id: i64,
        viewer: &User,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self.get(post_id, comment_id).await?;
        if !is_author(&comment, Some(viewer)) {
            return Err(CommentServiceError::NotAuthor(comment_id));
        }
        Ok(comment)
    }

    pub async fn update(
        &self,
        post_id: i64,
        comment_id: i64,
        viewer: &User,
        text: &str,
    ) -> Result<Comment, CommentServiceError> {
        self.get_owned(post_id, comment_id, viewer).await?;
        Ok(self
            .comments
            .update_text(comment_id, text)
            .await
            .context("Failed to update comment")?)
    }

    pub async fn delete(
        &self,
        post_id: i64,
        comment_id: i64,
        viewer: &User,
    ) -> Result<(), CommentServiceError> {
        self.get_owned(post_id, comment_id, viewer).await?;
        self.comments
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }

    /// One page of all comments, newest first (admin)
    pub async fn list_page(
        &self,
        raw_page: Option<&str>,
    ) -> Result<PagedResult<CommentWithAuthor>, CommentServiceError> {
        let total = self.count().await?;
        let params = ListParams::from_query(raw_page, self.per_page).clamp_to(total);
        let items = self
            .comments
            .list_recent(params.offset(), params.limit())
            .await
            .context("Failed to list comments")?;
        Ok(PagedResult::new(items, total, &params))
    }

    /// Delete any comment (admin)
    pub async fn admin_delete(&self, comment_id: i64) -> Result<(), CommentServiceError> {
        self.comments
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .ok_or(CommentServiceError::NotFound)?;
        self.comments
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, CommentServiceError> {
        Ok(self.comments.count().await.context("Failed to count comments")?)
    }
}
