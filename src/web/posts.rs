//! Post pages: public index, detail, and the author's create/edit/delete

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Form, Router,
};
use chrono::Utc;

use crate::forms::{CommentForm, FormErrors, PostForm};
use crate::models::{Category, Location, Post, PostDetails};
use crate::services::{is_author, PostFilter, PostServiceError};
use crate::web::common::{form_context, paged_context, post_url, profile_url, see_other, PageQuery};
use crate::web::middleware::{AppState, LoggedIn, Viewer, WebError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/posts/create/", get(create_form).post(create_submit))
        .route("/posts/{id}/", get(post_detail))
        .route("/posts/{id}/edit/", get(edit_form).post(edit_submit))
        .route("/posts/{id}/delete/", get(delete_confirm).post(delete_submit))
}

/// GET / - publicly visible posts, newest first
async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let filter = PostFilter::public(Utc::now());
    let posts = state
        .post_service
        .list_page(&filter.to_query(), query.raw())
        .await?;
    let context = paged_context("posts", &posts);
    state.render(viewer.user(), &viewer.path, "blog/index.html", &context)
}

/// GET /posts/{id}/
async fn post_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let post = state
        .post_service
        .get_visible(id, viewer.user(), Utc::now())
        .await?;
    render_detail(&state, &viewer, &post, &CommentForm::default(), &FormErrors::new()).await
}

/// Detail page with its comments and the comment form
pub(crate) async fn render_detail(
    state: &AppState,
    viewer: &Viewer,
    post: &PostDetails,
    comment_form: &CommentForm,
    errors: &FormErrors,
) -> Result<Response, WebError> {
    let comments = state.comment_service.list_for_post(post.post.id).await?;

    let mut context = form_context(comment_form, errors);
    context.insert("post", post);
    context.insert("comments", &comments);
    context.insert("is_author", &is_author(post, viewer.user()));
    state.render(viewer.user(), &viewer.path, "blog/detail.html", &context)
}

// ============================================================================
// Create / edit / delete
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn render_post_form(
    state: &AppState,
    me: &LoggedIn,
    mode: &str,
    post_id: Option<i64>,
    form: &PostForm,
    errors: &FormErrors,
    categories: &[Category],
    locations: &[Location],
) -> Result<Response, WebError> {
    let mut context = form_context(form, errors);
    context.insert("mode", mode);
    context.insert("post_id", &post_id);
    context.insert("categories", categories);
    context.insert("locations", locations);
    state.render(Some(&me.user), &me.path, "blog/create.html", &context)
}

/// The post if `me` wrote it, `None` if someone else did
async fn owned_post(state: &AppState, id: i64, me: &LoggedIn) -> Result<Option<Post>, WebError> {
    match state.post_service.get_owned(id, &me.user).await {
        Ok(post) => Ok(Some(post)),
        Err(PostServiceError::NotAuthor(_)) => {
            tracing::debug!(post_id = id, user_id = me.user.id, "Not the author, redirecting");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/create/
async fn create_form(State(state): State<AppState>, me: LoggedIn) -> Result<Response, WebError> {
    let (categories, locations) = state.post_service.form_choices().await?;
    render_post_form(
        &state,
        &me,
        "create",
        None,
        &PostForm::blank(Utc::now()),
        &FormErrors::new(),
        &categories,
        &locations,
    )
}

/// POST /posts/create/
async fn create_submit(
    State(state): State<AppState>,
    me: LoggedIn,
    Form(form): Form<PostForm>,
) -> Result<Response, WebError> {
    let (categories, locations) = state.post_service.form_choices().await?;
    match form.validate(&categories, &locations) {
        Ok(input) => {
            state.post_service.create(&me.user, &input).await?;
            Ok(see_other(profile_url(&me.user.username)))
        }
        Err(errors) => render_post_form(
            &state,
            &me,
            "create",
            None,
            &form,
            &errors,
            &categories,
            &locations,
        ),
    }
}

/// GET /posts/{id}/edit/
async fn edit_form(
    State(state): State<AppState>,
    me: LoggedIn,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let Some(post) = owned_post(&state, id, &me).await? else {
        return Ok(see_other(post_url(id)));
    };
    let (categories, locations) = state.post_service.form_choices().await?;
    render_post_form(
        &state,
        &me,
        "edit",
        Some(id),
        &PostForm::from_post(&post),
        &FormErrors::new(),
        &categories,
        &locations,
    )
}

/// POST /posts/{id}/edit/
async fn edit_submit(
    State(state): State<AppState>,
    me: LoggedIn,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Result<Response, WebError> {
    let Some(post) = owned_post(&state, id, &me).await? else {
        return Ok(see_other(post_url(id)));
    };
    let (categories, locations) = state.post_service.form_choices().await?;
    match form.validate(&categories, &locations) {
        Ok(mut input) => {
            input.is_published = post.is_published;
            state.post_service.update(id, &me.user, &input).await?;
            Ok(see_other(post_url(id)))
        }
        Err(errors) => render_post_form(
            &state,
            &me,
            "edit",
            Some(id),
            &form,
            &errors,
            &categories,
            &locations,
        ),
    }
}

/// GET /posts/{id}/delete/ - confirmation page
async fn delete_confirm(
    State(state): State<AppState>,
    me: LoggedIn,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let Some(post) = owned_post(&state, id, &me).await? else {
        return Ok(see_other(post_url(id)));
    };
    render_post_form(
        &state,
        &me,
        "delete",
        Some(id),
        &PostForm::from_post(&post),
        &FormErrors::new(),
        &[],
        &[],
    )
}

/// POST /posts/{id}/delete/
async fn delete_submit(
    State(state): State<AppState>,
    me: LoggedIn,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    if owned_post(&state, id, &me).await?.is_none() {
        return Ok(see_other(post_url(id)));
    }
    state.post_service.delete(id, &me.user).await?;
    Ok(see_other(profile_url(&me.user.username)))
}
