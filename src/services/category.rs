//! Category service
//!
//! Public category lookup plus the admin CRUD operations.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategoryInput};
use anyhow::Context;
use std::sync::Arc;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category not found, or not published where that matters
    #[error("Category not found")]
    NotFound,

    /// Slug already used by another category
    #[error("Slug '{0}' is already in use")]
    SlugTaken(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Category page lookup: unpublished categories do not exist for the
    /// public.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?
            .filter(|category| category.is_published)
            .ok_or(CategoryServiceError::NotFound)
    }

    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or(CategoryServiceError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.list().await.context("Failed to list categories")?)
    }

    pub async fn count(&self) -> Result<i64, CategoryServiceError> {
        Ok(self.repo.count().await.context("Failed to count categories")?)
    }

    pub async fn create(&self, input: &CategoryInput) -> Result<Category, CategoryServiceError> {
        if self
            .repo
            .exists_by_slug(&input.slug)
            .await
            .context("Failed to check slug")?
        {
            return Err(CategoryServiceError::SlugTaken(input.slug.clone()));
        }
        let category = self
            .repo
            .create(input)
            .await
            .context("Failed to create category")?;
        tracing::info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    pub async fn update(
        &self,
        id: i64,
        input: &CategoryInput,
    ) -> Result<Category, CategoryServiceError> {
        self.get(id).await?;
        if let Some(existing) = self
            .repo
            .get_by_slug(&input.slug)
            .await
            .context("Failed to check slug")?
        {
            if existing.id != id {
                return Err(CategoryServiceError::SlugTaken(input.slug.clone()));
            }
        }
        Ok(self
            .repo
            .update(id, input)
            .await
            .context("Failed to update category")?)
    }

    /// Delete a category; its posts stay, without a category
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        self.get(id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete category")?;
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }
}
