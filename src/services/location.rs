//! Location service (admin CRUD)

use crate::db::repositories::LocationRepository;
use crate::models::{Location, LocationInput};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LocationServiceError {
    #[error("Location not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct LocationService {
    repo: Arc<dyn LocationRepository>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: i64) -> Result<Location, LocationServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get location")?
            .ok_or(LocationServiceError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<Location>, LocationServiceError> {
        Ok(self.repo.list().await.context("Failed to list locations")?)
    }

    pub async fn count(&self) -> Result<i64, LocationServiceError> {
        Ok(self.repo.count().await.context("Failed to count locations")?)
    }

    pub async fn create(&self, input: &LocationInput) -> Result<Location, LocationServiceError> {
        Ok(self
            .repo
            .create(input)
            .await
            .context("Failed to create location")?)
    }

    pub async fn update(
        &self,
        id: i64,
        input: &LocationInput,
    ) -> Result<Location, LocationServiceError> {
        self.get(id).await?;
        Ok(self
            .repo
            .update(id, input)
            .await
            .context("Failed to update location")?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), LocationServiceError> {
        self.get(id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete location")?;
        Ok(())
    }
}
