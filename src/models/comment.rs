//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Comment joined with its author's username and the title of its post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_username: String,
    pub post_title: String,
}
