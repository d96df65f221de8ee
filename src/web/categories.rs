//! Category page

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;

use crate::services::PostFilter;
use crate::web::common::{paged_context, PageQuery};
use crate::web::middleware::{AppState, Viewer, WebError};

pub fn router() -> Router<AppState> {
    Router::new().route("/category/{slug}/", get(category_posts))
}

/// GET /category/{slug}/ - public posts of a published category
async fn category_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let category = state.category_service.get_published_by_slug(&slug).await?;

    let filter = PostFilter::public(Utc::now()).in_category(category.id);
    let posts = state
        .post_service
        .list_page(&filter.to_query(), query.raw())
        .await?;

    let mut context = paged_context("posts", &posts);
    context.insert("category", &category);
    state.render(viewer.user(), &viewer.path, "blog/category.html", &context)
}
