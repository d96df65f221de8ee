//! Admin screens
//!
//! Staff-only list/edit pages for posts, categories, locations and comments.
//! Anonymous visitors are sent to the login page, logged-in non-staff users
//! get 403 (both through the `Staff` extractor).
//!
//! Category and location edit pages carry their posts inline, with a
//! published checkbox per post. The post list edits `is_published` and
//! `category` of every listed row in one submit. Those bodies repeat keys,
//! so they are read as `Form<Vec<(String, String)>>`.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Form, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tera::Context as TeraContext;

use crate::forms::{pairs_to_map, AdminPostForm, CategoryForm, FormErrors, LocationForm};
use crate::models::{PostDetails, PostInput, PostQuery};
use crate::services::{CategoryServiceError, PostServiceError};
use crate::web::common::{form_context, paged_context, see_other, PageQuery};
use crate::web::middleware::{AppState, Staff, WebError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/", get(index))
        // Posts
        .route("/admin/posts/", get(post_list).post(post_list_save))
        .route("/admin/posts/add/", get(post_add_form).post(post_add_submit))
        .route("/admin/posts/{id}/", get(post_edit_form).post(post_edit_submit))
        .route(
            "/admin/posts/{id}/delete/",
            get(post_delete_confirm).post(post_delete_submit),
        )
        // Categories
        .route("/admin/categories/", get(category_list))
        .route(
            "/admin/categories/add/",
            get(category_add_form).post(category_add_submit),
        )
        .route(
            "/admin/categories/{id}/",
            get(category_edit_form).post(category_edit_submit),
        )
        .route(
            "/admin/categories/{id}/delete/",
            get(category_delete_confirm).post(category_delete_submit),
        )
        // Locations
        .route("/admin/locations/", get(location_list))
        .route(
            "/admin/locations/add/",
            get(location_add_form).post(location_add_submit),
        )
        .route(
            "/admin/locations/{id}/",
            get(location_edit_form).post(location_edit_submit),
        )
        .route(
            "/admin/locations/{id}/delete/",
            get(location_delete_confirm).post(location_delete_submit),
        )
        // Comments
        .route("/admin/comments/", get(comment_list))
        .route(
            "/admin/comments/{id}/delete/",
            get(comment_delete_confirm).post(comment_delete_submit),
        )
}

/// Record counts on the admin index
#[derive(Debug, Serialize)]
struct Counts {
    posts: i64,
    categories: i64,
    locations: i64,
    comments: i64,
    users: i64,
}

/// GET /admin/
async fn index(State(state): State<AppState>, staff: Staff) -> Result<Response, WebError> {
    let counts = Counts {
        posts: state.post_service.count(&PostQuery::default()).await?,
        categories: state.category_service.count().await?,
        locations: state.location_service.count().await?,
        comments: state.comment_service.count().await?,
        users: state.user_service.count().await?,
    };
    let mut context = TeraContext::new();
    context.insert("counts", &counts);
    state.render(Some(&staff.user), &staff.path, "admin/index.html", &context)
}

/// Context of the shared delete confirmation page
fn confirm_context(
    kind: &str,
    label: &str,
    action: String,
    cancel: String,
    note: Option<&str>,
) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("object_kind", kind);
    context.insert("object_label", label);
    context.insert("action", &action);
    context.insert("cancel", &cancel);
    context.insert("note", &note);
    context
}

/// Ids submitted under a repeated key
fn submitted_ids(pairs: &[(String, String)], key: &str) -> Vec<i64> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .filter_map(|(_, v)| v.trim().parse::<i64>().ok())
        .collect()
}

/// Apply the inline published checkboxes of a category/location edit page.
/// Only posts that still belong to the edited record are touched.
async fn apply_inline_toggles(
    state: &AppState,
    pairs: &[(String, String)],
    belongs: impl Fn(&PostDetails) -> bool,
) -> Result<usize, WebError> {
    let checked: HashSet<i64> = submitted_ids(pairs, "inline_published").into_iter().collect();
    let mut changed = 0;
    for post_id in submitted_ids(pairs, "inline_post") {
        let post = match state.post_service.get_details(post_id).await {
            Ok(post) => post,
            Err(PostServiceError::NotFound) => continue,
            Err(e) => return Err(e.into()),
        };
        if !belongs(&post) {
            continue;
        }
        let publish = checked.contains(&post_id);
        if post.post.is_published != publish {
            state.post_service.set_published(post_id, publish).await?;
            changed += 1;
        }
    }
    Ok(changed)
}

// ============================================================================
// Posts
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct PostListQuery {
    q: Option<String>,
    is_published: Option<String>,
    page: Option<String>,
}

impl PostListQuery {
    fn to_query(&self) -> PostQuery {
        PostQuery {
            title_contains: self
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
            is_published: match self.is_published.as_deref() {
                Some("1") => Some(true),
                Some("0") => Some(false),
                _ => None,
            },
            ..Default::default()
        }
    }

    /// The search and filter part of the query string, without the page
    fn filter_query(&self) -> String {
        format!(
            "q={}&is_published={}",
            urlencoding::encode(self.q.as_deref().unwrap_or("")),
            urlencoding::encode(self.is_published.as_deref().unwrap_or("")),
        )
    }

    /// Search, filter and page, for coming back to the same list page
    fn list_query(&self) -> String {
        match self.page.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(page) => format!("{}&page={}", self.filter_query(), urlencoding::encode(page)),
            None => self.filter_query(),
        }
    }
}

/// GET /admin/posts/
async fn post_list(
    State(state): State<AppState>,
    staff: Staff,
    Query(query): Query<PostListQuery>,
) -> Result<Response, WebError> {
    let posts = state
        .post_service
        .list_page(&query.to_query(), query.page.as_deref())
        .await?;
    let categories = state.category_service.list().await?;

    let mut context = paged_context("posts", &posts);
    context.insert("categories", &categories);
    context.insert("q", query.q.as_deref().unwrap_or(""));
    context.insert("is_published_filter", query.is_published.as_deref().unwrap_or(""));
    context.insert("filter_query", &query.filter_query());
    state.render(Some(&staff.user), &staff.path, "admin/post_list.html", &context)
}

/// POST /admin/posts/ - save the editable columns of every listed row
async fn post_list_save(
    State(state): State<AppState>,
    staff: Staff,
    Query(query): Query<PostListQuery>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let fields = pairs_to_map(&pairs);
    let category_ids: HashSet<i64> = state
        .category_service
        .list()
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut changed = 0;
    for post_id in submitted_ids(&pairs, "post") {
        let post = match state.post_service.get_details(post_id).await {
            Ok(post) => post.post,
            Err(PostServiceError::NotFound) => continue,
            Err(e) => return Err(e.into()),
        };

        let publish = fields.contains_key(&format!("published_{}", post_id));
        if post.is_published != publish {
            state.post_service.set_published(post_id, publish).await?;
            changed += 1;
        }

        if let Some(raw) = fields.get(&format!("category_{}", post_id)) {
            let category = match raw.trim() {
                "" => None,
                id => match id.parse::<i64>() {
                    Ok(id) if category_ids.contains(&id) => Some(id),
                    _ => {
                        tracing::warn!(post_id, value = %raw, "Ignoring unknown category");
                        continue;
                    }
                },
            };
            if post.category_id != category {
                state.post_service.set_category(post_id, category).await?;
                changed += 1;
            }
        }
    }

    tracing::info!(user_id = staff.user.id, changed, "Admin post list saved");
    Ok(see_other(format!("/admin/posts/?{}", query.list_query())))
}

async fn render_post_form(
    state: &AppState,
    staff: &Staff,
    object_id: Option<i64>,
    form: &AdminPostForm,
    errors: &FormErrors,
) -> Result<Response, WebError> {
    let users = state.user_service.list().await?;
    let (categories, locations) = state.post_service.form_choices().await?;

    let mut context = form_context(form, errors);
    context.insert("object_id", &object_id);
    context.insert("users", &users);
    context.insert("categories", &categories);
    context.insert("locations", &locations);
    state.render(Some(&staff.user), &staff.path, "admin/post_form.html", &context)
}

/// Validate an admin post form against the current choices
async fn validate_post_form(
    state: &AppState,
    form: &AdminPostForm,
) -> Result<Result<(i64, PostInput), FormErrors>, WebError> {
    let users = state.user_service.list().await?;
    let (categories, locations) = state.post_service.form_choices().await?;
    Ok(form.validate(&users, &categories, &locations))
}

/// GET /admin/posts/add/
async fn post_add_form(State(state): State<AppState>, staff: Staff) -> Result<Response, WebError> {
    let form = AdminPostForm::blank(Utc::now());
    render_post_form(&state, &staff, None, &form, &FormErrors::new()).await
}

/// POST /admin/posts/add/
async fn post_add_submit(
    State(state): State<AppState>,
    staff: Staff,
    Form(form): Form<AdminPostForm>,
) -> Result<Response, WebError> {
    match validate_post_form(&state, &form).await? {
        Ok((author_id, input)) => {
            let post = state.post_service.admin_create(author_id, &input).await?;
            tracing::info!(post_id = post.id, user_id = staff.user.id, "Admin created post");
            Ok(see_other("/admin/posts/"))
        }
        Err(errors) => render_post_form(&state, &staff, None, &form, &errors).await,
    }
}

/// GET /admin/posts/{id}/
async fn post_edit_form(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let post = state.post_service.get_details(id).await?;
    let form = AdminPostForm::from_post(&post.post);
    render_post_form(&state, &staff, Some(id), &form, &FormErrors::new()).await
}

/// POST /admin/posts/{id}/
async fn post_edit_submit(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
    Form(form): Form<AdminPostForm>,
) -> Result<Response, WebError> {
    state.post_service.get_details(id).await?;
    match validate_post_form(&state, &form).await? {
        Ok((author_id, input)) => {
            state.post_service.admin_update(id, author_id, &input).await?;
            Ok(see_other("/admin/posts/"))
        }
        Err(errors) => render_post_form(&state, &staff, Some(id), &form, &errors).await,
    }
}

/// GET /admin/posts/{id}/delete/
async fn post_delete_confirm(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let post = state.post_service.get_details(id).await?;
    let context = confirm_context(
        "post",
        &post.post.title,
        format!("/admin/posts/{}/delete/", id),
        format!("/admin/posts/{}/", id),
        Some("Its comments will be deleted as well."),
    );
    state.render(Some(&staff.user), &staff.path, "admin/confirm_delete.html", &context)
}

/// POST /admin/posts/{id}/delete/
async fn post_delete_submit(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    state.post_service.admin_delete(id).await?;
    tracing::info!(post_id = id, user_id = staff.user.id, "Admin deleted post");
    Ok(see_other("/admin/posts/"))
}

// ============================================================================
// Categories
// ============================================================================

fn category_form_from_pairs(pairs: &[(String, String)]) -> CategoryForm {
    let fields = pairs_to_map(pairs);
    let field = |key: &str| fields.get(key).cloned().unwrap_or_default();
    CategoryForm {
        title: field("title"),
        description: field("description"),
        slug: field("slug"),
        is_published: fields.get("is_published").cloned(),
    }
}

async fn render_category_form(
    state: &AppState,
    staff: &Staff,
    object_id: Option<i64>,
    form: &CategoryForm,
    errors: &FormErrors,
) -> Result<Response, WebError> {
    let inline_posts = match object_id {
        Some(id) => {
            let query = PostQuery {
                category_id: Some(id),
                ..Default::default()
            };
            state.post_service.list_all(&query).await?
        }
        None => Vec::new(),
    };

    let mut context = form_context(form, errors);
    context.insert("object_id", &object_id);
    context.insert("inline_posts", &inline_posts);
    state.render(Some(&staff.user), &staff.path, "admin/category_form.html", &context)
}

fn slug_taken(slug: &str) -> FormErrors {
    FormErrors::single("slug", format!("Category with slug '{}' already exists.", slug))
}

/// GET /admin/categories/
async fn category_list(State(state): State<AppState>, staff: Staff) -> Result<Response, WebError> {
    let categories = state.category_service.list().await?;
    let mut context = TeraContext::new();
    context.insert("categories", &categories);
    state.render(Some(&staff.user), &staff.path, "admin/category_list.html", &context)
}

/// GET /admin/categories/add/
async fn category_add_form(State(state): State<AppState>, staff: Staff) -> Result<Response, WebError> {
    render_category_form(&state, &staff, None, &CategoryForm::blank(), &FormErrors::new()).await
}

/// POST /admin/categories/add/
async fn category_add_submit(
    State(state): State<AppState>,
    staff: Staff,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let form = category_form_from_pairs(&pairs);
    let errors = match form.validate() {
        Ok(input) => match state.category_service.create(&input).await {
            Ok(_) => return Ok(see_other("/admin/categories/")),
            Err(CategoryServiceError::SlugTaken(slug)) => slug_taken(&slug),
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };
    render_category_form(&state, &staff, None, &form, &errors).await
}

/// GET /admin/categories/{id}/
async fn category_edit_form(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let category = state.category_service.get(id).await?;
    let form = CategoryForm::from_category(&category);
    render_category_form(&state, &staff, Some(id), &form, &FormErrors::new()).await
}

/// POST /admin/categories/{id}/ - category fields plus inline post toggles
async fn category_edit_submit(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    state.category_service.get(id).await?;
    let form = category_form_from_pairs(&pairs);
    let errors = match form.validate() {
        Ok(input) => match state.category_service.update(id, &input).await {
            Ok(_) => {
                apply_inline_toggles(&state, &pairs, |post| post.post.category_id == Some(id))
                    .await?;
                return Ok(see_other("/admin/categories/"));
            }
            Err(CategoryServiceError::SlugTaken(slug)) => slug_taken(&slug),
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };
    render_category_form(&state, &staff, Some(id), &form, &errors).await
}

/// GET /admin/categories/{id}/delete/
async fn category_delete_confirm(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let category = state.category_service.get(id).await?;
    let context = confirm_context(
        "category",
        &category.title,
        format!("/admin/categories/{}/delete/", id),
        format!("/admin/categories/{}/", id),
        Some("Its posts are kept without a category."),
    );
    state.render(Some(&staff.user), &staff.path, "admin/confirm_delete.html", &context)
}

/// POST /admin/categories/{id}/delete/
async fn category_delete_submit(
    State(state): State<AppState>,
    _staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    state.category_service.delete(id).await?;
    Ok(see_other("/admin/categories/"))
}

// ============================================================================
// Locations
// ============================================================================

fn location_form_from_pairs(pairs: &[(String, String)]) -> LocationForm {
    let fields = pairs_to_map(pairs);
    LocationForm {
        name: fields.get("name").cloned().unwrap_or_default(),
        is_published: fields.get("is_published").cloned(),
    }
}

async fn render_location_form(
    state: &AppState,
    staff: &Staff,
    object_id: Option<i64>,
    form: &LocationForm,
    errors: &FormErrors,
) -> Result<Response, WebError> {
    let inline_posts = match object_id {
        Some(id) => {
            let query = PostQuery {
                location_id: Some(id),
                ..Default::default()
            };
            state.post_service.list_all(&query).await?
        }
        None => Vec::new(),
    };

    let mut context = form_context(form, errors);
    context.insert("object_id", &object_id);
    context.insert("inline_posts", &inline_posts);
    state.render(Some(&staff.user), &staff.path, "admin/location_form.html", &context)
}

/// GET /admin/locations/
async fn location_list(State(state): State<AppState>, staff: Staff) -> Result<Response, WebError> {
    let locations = state.location_service.list().await?;
    let mut context = TeraContext::new();
    context.insert("locations", &locations);
    state.render(Some(&staff.user), &staff.path, "admin/location_list.html", &context)
}

/// GET /admin/locations/add/
async fn location_add_form(State(state): State<AppState>, staff: Staff) -> Result<Response, WebError> {
    render_location_form(&state, &staff, None, &LocationForm::blank(), &FormErrors::new()).await
}

/// POST /admin/locations/add/
async fn location_add_submit(
    State(state): State<AppState>,
    staff: Staff,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let form = location_form_from_pairs(&pairs);
    match form.validate() {
        Ok(input) => {
            state.location_service.create(&input).await?;
            Ok(see_other("/admin/locations/"))
        }
        Err(errors) => render_location_form(&state, &staff, None, &form, &errors).await,
    }
}

/// GET /admin/locations/{id}/
async fn location_edit_form(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let location = state.location_service.get(id).await?;
    let form = LocationForm::from_location(&location);
    render_location_form(&state, &staff, Some(id), &form, &FormErrors::new()).await
}

/// POST /admin/locations/{id}/ - location fields plus inline post toggles
async fn location_edit_submit(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    state.location_service.get(id).await?;
    let form = location_form_from_pairs(&pairs);
    match form.validate() {
        Ok(input) => {
            state.location_service.update(id, &input).await?;
            apply_inline_toggles(&state, &pairs, |post| post.post.location_id == Some(id)).await?;
            Ok(see_other("/admin/locations/"))
        }
        Err(errors) => render_location_form(&state, &staff, Some(id), &form, &errors).await,
    }
}

/// GET /admin/locations/{id}/delete/
async fn location_delete_confirm(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let location = state.location_service.get(id).await?;
    let context = confirm_context(
        "location",
        &location.name,
        format!("/admin/locations/{}/delete/", id),
        format!("/admin/locations/{}/", id),
        Some("Its posts are kept without a location."),
    );
    state.render(Some(&staff.user), &staff.path, "admin/confirm_delete.html", &context)
}

/// POST /admin/locations/{id}/delete/
async fn location_delete_submit(
    State(state): State<AppState>,
    _staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    state.location_service.delete(id).await?;
    Ok(see_other("/admin/locations/"))
}

// ============================================================================
// Comments
// ============================================================================

/// GET /admin/comments/
async fn comment_list(
    State(state): State<AppState>,
    staff: Staff,
    Query(query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let comments = state.comment_service.list_page(query.raw()).await?;
    let context = paged_context("comments", &comments);
    state.render(Some(&staff.user), &staff.path, "admin/comment_list.html", &context)
}

/// GET /admin/comments/{id}/delete/
async fn comment_delete_confirm(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let context = confirm_context(
        "comment",
        &format!("#{}", id),
        format!("/admin/comments/{}/delete/", id),
        "/admin/comments/".to_string(),
        None,
    );
    state.render(Some(&staff.user), &staff.path, "admin/confirm_delete.html", &context)
}

/// POST /admin/comments/{id}/delete/
async fn comment_delete_submit(
    State(state): State<AppState>,
    staff: Staff,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    state.comment_service.admin_delete(id).await?;
    tracing::info!(comment_id = id, user_id = staff.user.id, "Admin deleted comment");
    Ok(see_other("/admin/comments/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_submitted_ids_skips_garbage() {
        let body = pairs(&[("post", "3"), ("post", "x"), ("other", "4"), ("post", " 7 ")]);
        assert_eq!(submitted_ids(&body, "post"), vec![3, 7]);
    }

    #[test]
    fn test_post_list_query_filters() {
        let query = PostListQuery {
            q: Some("  Hello ".into()),
            is_published: Some("0".into()),
            page: None,
        };
        let post_query = query.to_query();
        assert_eq!(post_query.title_contains.as_deref(), Some("Hello"));
        assert_eq!(post_query.is_published, Some(false));
        assert!(post_query.visible_at.is_none());

        let blank = PostListQuery {
            q: Some("   ".into()),
            is_published: Some("maybe".into()),
            page: None,
        };
        assert_eq!(blank.to_query(), PostQuery::default());
    }

    #[test]
    fn test_filter_query_is_encoded() {
        let query = PostListQuery {
            q: Some("a&b".into()),
            is_published: Some("1".into()),
            page: Some("3".into()),
        };
        assert_eq!(query.filter_query(), "q=a%26b&is_published=1");
        assert_eq!(query.list_query(), "q=a%26b&is_published=1&page=3");
    }

    #[test]
    fn test_list_query_without_page() {
        let query = PostListQuery {
            q: None,
            is_published: None,
            page: Some(" ".into()),
        };
        assert_eq!(query.list_query(), "q=&is_published=");
    }

    #[test]
    fn test_category_form_from_pairs() {
        let body = pairs(&[
            ("title", "Travel"),
            ("description", "Trips"),
            ("slug", "travel"),
            ("inline_post", "1"),
        ]);
        let form = category_form_from_pairs(&body);
        assert_eq!(form.slug, "travel");
        assert!(form.is_published.is_none());
    }
}
