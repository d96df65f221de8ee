//! Post visibility and ownership rules
//!
//! Who may see which posts:
//! - everyone sees publicly visible posts (published, in a published
//!   category, `pub_date` not in the future)
//! - an author looking at their own profile sees all of their posts
//!
//! Who may change what: only the author of a post or comment may edit or
//! delete it.

use chrono::{DateTime, Utc};

use crate::models::{Comment, Post, PostDetails, PostQuery, User};

/// Listing filter resolved from the viewer and the page being looked at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostFilter {
    author_id: Option<i64>,
    category_id: Option<i64>,
    visible_at: Option<DateTime<Utc>>,
}

impl PostFilter {
    /// Filter for public listings: every author, visibility enforced
    pub fn public(now: DateTime<Utc>) -> Self {
        Self {
            author_id: None,
            category_id: None,
            visible_at: Some(now),
        }
    }

    /// Filter for a listing, optionally restricted to one author.
    ///
    /// Without an author every post is subject to the visibility predicate.
    /// With an author, the predicate is dropped only when the viewer is that
    /// author and `guest` is not set.
    pub fn resolve(
        author_id: Option<i64>,
        viewer_id: Option<i64>,
        guest: bool,
        now: DateTime<Utc>,
    ) -> Self {
        match author_id {
            None => Self::public(now),
            Some(author) => {
                let own = !guest && viewer_id == Some(author);
                Self {
                    author_id: Some(author),
                    category_id: None,
                    visible_at: if own { None } else { Some(now) },
                }
            }
        }
    }

    /// Narrow the filter to one category
    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Whether the visibility predicate applies
    pub fn enforces_visibility(&self) -> bool {
        self.visible_at.is_some()
    }

    /// Repository query for this filter
    pub fn to_query(&self) -> PostQuery {
        PostQuery {
            author_id: self.author_id,
            category_id: self.category_id,
            visible_at: self.visible_at,
            ..Default::default()
        }
    }
}

/// Anything that has an author
pub trait Authored {
    fn author_id(&self) -> i64;
}

impl Authored for Post {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl Authored for PostDetails {
    fn author_id(&self) -> i64 {
        self.post.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

/// Is `viewer` the author of `item`? Anonymous viewers never are.
pub fn is_author<T: Authored + ?Sized>(item: &T, viewer: Option<&User>) -> bool {
    viewer.is_some_and(|user| user.id == item.author_id())
}

/// May `viewer` open the detail page of `post` at `now`?
pub fn can_view(post: &PostDetails, viewer: Option<&User>, now: DateTime<Utc>) -> bool {
    is_author(post, viewer) || post.is_publicly_visible(now)
}
