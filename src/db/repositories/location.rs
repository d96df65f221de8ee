//! Location repository

use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{Location, LocationInput};
use crate::with_backend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Location repository trait
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn create(&self, input: &LocationInput) -> Result<Location>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    /// List all locations ordered by name
    async fn list(&self) -> Result<Vec<Location>>;

    async fn update(&self, id: i64, input: &LocationInput) -> Result<Location>;

    /// Delete a location. Posts that referenced it lose their location.
    async fn delete(&self, id: i64) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DynDatabasePool,
}

impl SqlxLocationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, input: &LocationInput) -> Result<Location> {
        let now = Utc::now();
        let id = with_backend!(self.pool, |p| sqlx::query(
            "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)"
        )
        .bind(&input.name)
        .bind(input.is_published)
        .bind(now)
        .execute(p)
        .await
        .map(|result| result.inserted_id()))
        .context("Failed to create location")?;

        Ok(Location {
            id,
            name: input.name.clone(),
            is_published: input.is_published,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        with_backend!(self.pool, |p| sqlx::query_as::<_, Location>(
            "SELECT id, name, is_published, created_at FROM locations WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(p)
        .await)
        .context("Failed to get location by ID")
    }

    async fn list(&self) -> Result<Vec<Location>> {
        with_backend!(self.pool, |p| sqlx::query_as::<_, Location>(
            "SELECT id, name, is_published, created_at FROM locations ORDER BY name, id"
        )
        .fetch_all(p)
        .await)
        .context("Failed to list locations")
    }

    async fn update(&self, id: i64, input: &LocationInput) -> Result<Location> {
        with_backend!(self.pool, |p| sqlx::query(
            "UPDATE locations SET name = ?, is_published = ? WHERE id = ?"
        )
        .bind(&input.name)
        .bind(input.is_published)
        .bind(id)
        .execute(p)
        .await
        .map(|_| ()))
        .context("Failed to update location")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Location {} not found after update", id))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_backend!(self.pool, |p| sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .map(|_| ()))
        .context("Failed to delete location")
    }

    async fn count(&self) -> Result<i64> {
        with_backend!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM locations"
        )
        .fetch_one(p)
        .await)
        .context("Failed to count locations")
    }
}
