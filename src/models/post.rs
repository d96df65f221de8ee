//! Post model
//!
//! Posts carry a publish date that may lie in the future (scheduled posts), an
//! optional category and an optional location.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity as stored in the `posts` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Headline
    pub title: String,
    /// Body text
    pub text: String,
    /// Moment the post becomes public. A future value schedules the post.
    pub pub_date: DateTime<Utc>,
    /// Owning user
    pub author_id: i64,
    /// Optional place the post is about
    pub location_id: Option<i64>,
    /// Optional category; posts without one never show up publicly
    pub category_id: Option<i64>,
    /// Hidden from the public when false
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Category fields rendered next to a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRef {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
}

/// Location fields rendered next to a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationRef {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
}

/// A post joined with its author, category and location, annotated with the
/// number of comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetails {
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub category: Option<CategoryRef>,
    pub location: Option<LocationRef>,
    pub comment_count: i64,
}

impl PostDetails {
    /// Whether anyone may see the post at `now`
    pub fn is_publicly_visible(&self, now: DateTime<Utc>) -> bool {
        is_publicly_visible(
            &self.post,
            self.category.as_ref().map(|c| c.is_published),
            now,
        )
    }
}

/// Public-visibility predicate: published, in a published category, and
/// `pub_date` not in the future.
pub fn is_publicly_visible(
    post: &Post,
    category_published: Option<bool>,
    now: DateTime<Utc>,
) -> bool {
    post.is_published && category_published == Some(true) && post.pub_date <= now
}

/// Input for creating or replacing a post
#[derive(Debug, Clone, PartialEq)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub is_published: bool,
}

/// Row filter for post listings.
///
/// Built by `services::visibility`; the post repository turns it into SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostQuery {
    /// Only posts by this author
    pub author_id: Option<i64>,
    /// Only posts in this category
    pub category_id: Option<i64>,
    /// Only posts at this location
    pub location_id: Option<i64>,
    /// When set, only posts publicly visible at this instant
    pub visible_at: Option<DateTime<Utc>>,
    /// ASCII case-insensitive substring match on the title (admin search)
    pub title_contains: Option<String>,
    /// Exact match on the published flag (admin filter)
    pub is_published: Option<bool>,
}

impl PostQuery {
    /// Evaluate the filter against one row, the same way the SQL does
    pub fn matches(&self, post: &Post, category_published: Option<bool>) -> bool {
        if let Some(author_id) = self.author_id {
            if post.author_id != author_id {
                return false;
            }
        }
        if let Some(category_id) = self.category_id {
            if post.category_id != Some(category_id) {
                return false;
            }
        }
        if let Some(location_id) = self.location_id {
            if post.location_id != Some(location_id) {
                return false;
            }
        }
        if let Some(now) = self.visible_at {
            if !is_publicly_visible(post, category_published, now) {
                return false;
            }
        }
        if let Some(ref needle) = self.title_contains {
            if !post
                .title
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase())
            {
                return false;
            }
        }
        if let Some(flag) = self.is_published {
            if post.is_published != flag {
                return false;
            }
        }
        true
    }
}
