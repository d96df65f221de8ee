//! Web layer - HTML handlers and routing
//!
//! - Public pages: index, post detail, category, profile
//! - Author pages: post create/edit/delete, comments, profile editing
//! - Auth: registration, login, logout
//! - Admin screens (staff only)

pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod common;
pub mod middleware;
pub mod posts;
pub mod profile;

use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxCommentRepository, SqlxLocationRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{CategoryService, CommentService, LocationService, PostService, UserService};
use crate::templates::TemplateEngine;

pub use middleware::{AppState, LoggedIn, Staff, Viewer, WebError};

/// Wire repositories and services over `pool`
pub fn build_state(pool: DynDatabasePool, config: &Config, templates: TemplateEngine) -> AppState {
    let per_page = config.site.posts_per_page;

    let user_service = UserService::with_session_ttl(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool.clone()),
        config.session.ttl_days,
    );
    let post_service = PostService::new(
        SqlxPostRepository::boxed(pool.clone()),
        SqlxCategoryRepository::boxed(pool.clone()),
        SqlxLocationRepository::boxed(pool.clone()),
        per_page,
    );
    let comment_service = CommentService::new(SqlxCommentRepository::boxed(pool.clone()), per_page);
    let category_service = CategoryService::new(SqlxCategoryRepository::boxed(pool.clone()));
    let location_service = LocationService::new(SqlxLocationRepository::boxed(pool));

    AppState {
        user_service: Arc::new(user_service),
        post_service: Arc::new(post_service),
        comment_service: Arc::new(comment_service),
        category_service: Arc::new(category_service),
        location_service: Arc::new(location_service),
        templates: Arc::new(templates),
        site_name: Arc::from(config.site.name.as_str()),
        session_ttl_days: config.session.ttl_days,
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(posts::router())
        .merge(comments::router())
        .merge(categories::router())
        .merge(profile::router())
        .merge(auth::router())
        .merge(admin::router())
        .fallback(not_found)
        // Runs inside optional_auth so error pages know the user
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> WebError {
    WebError::NotFound
}

#[cfg(test)]
mod tests;
