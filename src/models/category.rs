//! Category model
//!
//! Thematic buckets for posts. An unpublished category hides every post in it
//! from public listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Display title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// URL identifier; latin letters, digits, hyphen and underscore
    pub slug: String,
    /// Hidden from the public when false
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new Category. The ID is assigned by the database.
    pub fn new(title: String, description: String, slug: String, is_published: bool) -> Self {
        Self {
            id: 0,
            title,
            description,
            slug,
            is_published,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating or replacing a category
#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

/// Check the slug alphabet: `[A-Za-z0-9_-]+`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
