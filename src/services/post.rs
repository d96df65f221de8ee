//! Post service
//!
//! Listing, detail lookup and mutation of posts. Ownership is enforced here
//! for the author-facing operations; admin operations skip it.

use crate::db::repositories::{CategoryRepository, LocationRepository, PostRepository};
use crate::models::{
    Category, ListParams, Location, PagedResult, Post, PostDetails, PostInput, PostQuery, User,
};
use crate::services::visibility::{can_view, is_author};
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post does not exist or is hidden from the viewer
    #[error("Post not found")]
    NotFound,

    /// Viewer is not the author of the post
    #[error("Post {0} belongs to another user")]
    NotAuthor(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
    per_page: u32,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        locations: Arc<dyn LocationRepository>,
        per_page: u32,
    ) -> Self {
        Self {
            posts,
            categories,
            locations,
            per_page,
        }
    }

    /// One page of posts matching `query`.
    ///
    /// `raw_page` is the unparsed `?page=` value: garbage selects the first
    /// page and numbers past the end select the last one.
    pub async fn list_page(
        &self,
        query: &PostQuery,
        raw_page: Option<&str>,
    ) -> Result<PagedResult<PostDetails>, PostServiceError> {
        let total = self.posts.count(query).await.context("Failed to count posts")?;
        let params = ListParams::from_query(raw_page, self.per_page).clamp_to(total);
        let items = self
            .posts
            .list(query, params.offset(), params.limit())
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(items, total, &params))
    }

    /// Every post matching `query`, unpaged
    pub async fn list_all(&self, query: &PostQuery) -> Result<Vec<PostDetails>, PostServiceError> {
        Ok(self
            .posts
            .list(query, 0, i64::MAX)
            .await
            .context("Failed to list posts")?)
    }

    pub async fn count(&self, query: &PostQuery) -> Result<i64, PostServiceError> {
        Ok(self.posts.count(query).await.context("Failed to count posts")?)
    }

    /// Post with its relations, regardless of visibility
    pub async fn get_details(&self, id: i64) -> Result<PostDetails, PostServiceError> {
        self.posts
            .get_details(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)
    }

    /// Post as seen by `viewer`: authors always see their own posts, everyone
    /// else only publicly visible ones.
    pub async fn get_visible(
        &self,
        id: i64,
        viewer: Option<&User>,
        now: DateTime<Utc>,
    ) -> Result<PostDetails, PostServiceError> {
        let post = self.get_details(id).await?;
        if can_view(&post, viewer, now) {
            Ok(post)
        } else {
            Err(PostServiceError::NotFound)
        }
    }

    /// Post that `viewer` is allowed to change
    pub async fn get_owned(&self, id: i64, viewer: &User) -> Result<Post, PostServiceError> {
        let post = self
            .posts
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;
        if !is_author(&post, Some(viewer)) {
            return Err(PostServiceError::NotAuthor(id));
        }
        Ok(post)
    }

    /// Categories and locations offered by the post form
    pub async fn form_choices(&self) -> Result<(Vec<Category>, Vec<Location>), PostServiceError> {
        let categories = self
            .categories
            .list()
            .await
            .context("Failed to list categories")?;
        let locations = self
            .locations
            .list()
            .await
            .context("Failed to list locations")?;
        Ok((categories, locations))
    }

    /// Create a post owned by `author`
    pub async fn create(&self, author: &User, input: &PostInput) -> Result<Post, PostServiceError> {
        let post = self
            .posts
            .create(author.id, input)
            .await
            .context("Failed to create post")?;
        tracing::info!(post_id = post.id, author_id = author.id, "Post created");
        Ok(post)
    }

    /// Update a post on behalf of its author
    pub async fn update(
        &self,
        id: i64,
        viewer: &User,
        input: &PostInput,
    ) -> Result<Post, PostServiceError> {
        self.get_owned(id, viewer).await?;
        Ok(self
            .posts
            .update(id, input)
            .await
            .context("Failed to update post")?)
    }

    /// Delete a post on behalf of its author
    pub async fn delete(&self, id: i64, viewer: &User) -> Result<(), PostServiceError> {
        self.get_owned(id, viewer).await?;
        self.posts.delete(id).await.context("Failed to delete post")?;
        tracing::info!(post_id = id, author_id = viewer.id, "Post deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Admin operations
    // ------------------------------------------------------------------

    /// Create a post for any author
    pub async fn admin_create(
        &self,
        author_id: i64,
        input: &PostInput,
    ) -> Result<Post, PostServiceError> {
        Ok(self
            .posts
            .create(author_id, input)
            .await
            .context("Failed to create post")?)
    }

    /// Replace every field of a post, author included
    pub async fn admin_update(
        &self,
        id: i64,
        author_id: i64,
        input: &PostInput,
    ) -> Result<Post, PostServiceError> {
        self.get_details(id).await?;
        self.posts
            .set_author(id, author_id)
            .await
            .context("Failed to change post author")?;
        Ok(self
            .posts
            .update(id, input)
            .await
            .context("Failed to update post")?)
    }

    pub async fn admin_delete(&self, id: i64) -> Result<(), PostServiceError> {
        self.get_details(id).await?;
        self.posts.delete(id).await.context("Failed to delete post")?;
        Ok(())
    }

    pub async fn set_published(&self, id: i64, is_published: bool) -> Result<(), PostServiceError> {
        Ok(self
            .posts
            .set_published(id, is_published)
            .await
            .context("Failed to change published flag")?)
    }

    pub async fn set_category(
        &self,
        id: i64,
        category_id: Option<i64>,
    ) -> Result<(), PostServiceError> {
        Ok(self
            .posts
            .set_category(id, category_id)
            .await
            .context("Failed to change category")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxLocationRepository, SqlxPostRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::CategoryInput;
    use crate::services::visibility::PostFilter;
    use chrono::Duration;

    struct Fixture {
        service: PostService,
        alice: User,
        bob: User,
        category: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let users = SqlxUserRepository::new(pool.clone());
        let alice = users
            .create(&User::new("alice".into(), String::new(), "h".into(), false))
            .await
            .unwrap();
        let bob = users
            .create(&User::new("bob".into(), String::new(), "h".into(), false))
            .await
            .unwrap();
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let category = categories
            .create(&CategoryInput {
                title: "General".into(),
                description: String::new(),
                slug: "general".into(),
                is_published: true,
            })
            .await
            .unwrap()
            .id;
        let service = PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            categories,
            SqlxLocationRepository::boxed(pool),
            10,
        );
        Fixture {
            service,
            alice,
            bob,
            category,
        }
    }

    fn input(title: &str, pub_date: DateTime<Utc>, category: i64) -> PostInput {
        PostInput {
            title: title.into(),
            text: "text".into(),
            pub_date,
            location_id: None,
            category_id: Some(category),
            is_published: true,
        }
    }

    #[tokio::test]
    async fn test_unpublished_post_hidden_from_index_but_on_own_profile() {
        let fx = setup().await;
        let now = Utc::now();
        let mut draft = input("Draft", now - Duration::hours(1), fx.category);
        draft.is_published = false;
        fx.service.create(&fx.bob, &draft).await.unwrap();

        let index = fx
            .service
            .list_page(&PostFilter::public(now).to_query(), None)
            .await
            .unwrap();
        assert_eq!(index.total, 0);

        let own = PostFilter::resolve(Some(fx.bob.id), Some(fx.bob.id), false, now);
        let profile = fx.service.list_page(&own.to_query(), None).await.unwrap();
        assert_eq!(profile.items.len(), 1);

        let guest = PostFilter::resolve(Some(fx.bob.id), Some(fx.alice.id), false, now);
        let profile = fx.service.list_page(&guest.to_query(), None).await.unwrap();
        assert!(profile.items.is_empty());
    }

    #[tokio::test]
    async fn test_future_post_visible_only_to_author() {
        let fx = setup().await;
        let now = Utc::now();
        let post = fx
            .service
            .create(&fx.alice, &input("Later", now + Duration::hours(1), fx.category))
            .await
            .unwrap();

        assert!(fx.service.get_visible(post.id, Some(&fx.alice), now).await.is_ok());
        assert!(matches!(
            fx.service.get_visible(post.id, Some(&fx.bob), now).await,
            Err(PostServiceError::NotFound)
        ));
        assert!(matches!(
            fx.service.get_visible(post.id, None, now).await,
            Err(PostServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_non_author_cannot_update_or_delete() {
        let fx = setup().await;
        let post = fx
            .service
            .create(&fx.alice, &input("Mine", Utc::now(), fx.category))
            .await
            .unwrap();

        let update = fx
            .service
            .update(post.id, &fx.bob, &input("Hijacked", Utc::now(), fx.category))
            .await;
        assert!(matches!(update, Err(PostServiceError::NotAuthor(_))));

        let delete = fx.service.delete(post.id, &fx.bob).await;
        assert!(matches!(delete, Err(PostServiceError::NotAuthor(_))));

        let unchanged = fx.service.get_details(post.id).await.unwrap();
        assert_eq!(unchanged.post.title, "Mine");
    }

    #[tokio::test]
    async fn test_author_update_and_delete() {
        let fx = setup().await;
        let post = fx
            .service
            .create(&fx.alice, &input("Mine", Utc::now(), fx.category))
            .await
            .unwrap();

        let updated = fx
            .service
            .update(post.id, &fx.alice, &input("Renamed", Utc::now(), fx.category))
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");

        fx.service.delete(post.id, &fx.alice).await.unwrap();
        assert!(matches!(
            fx.service.get_details(post.id).await,
            Err(PostServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_pagination_clamps_out_of_range_page() {
        let fx = setup().await;
        let base = Utc::now() - Duration::days(30);
        for i in 0..13 {
            fx.service
                .create(&fx.alice, &input(&format!("p{:02}", i), base + Duration::hours(i), fx.category))
                .await
                .unwrap();
        }
        let query = PostFilter::public(Utc::now()).to_query();

        let first = fx.service.list_page(&query, Some("abc")).await.unwrap();
        assert_eq!(first.page, 1);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].post.title, "p12");

        let last = fx.service.list_page(&query, Some("99")).await.unwrap();
        assert_eq!(last.page, 2);
        assert_eq!(last.items.len(), 3);
        assert_eq!(last.total_pages(), 2);
    }

    #[tokio::test]
    async fn test_admin_update_changes_author() {
        let fx = setup().await;
        let post = fx
            .service
            .create(&fx.alice, &input("Mine", Utc::now(), fx.category))
            .await
            .unwrap();

        let updated = fx
            .service
            .admin_update(post.id, fx.bob.id, &input("Moved", Utc::now(), fx.category))
            .await
            .unwrap();

        assert_eq!(updated.author_id, fx.bob.id);
        assert_eq!(updated.title, "Moved");
    }
}
