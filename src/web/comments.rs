//! Comment handlers
//!
//! Comments are always addressed through their post. Only the author of a
//! comment may edit or delete it; anyone else is sent back to the post.

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;

use crate::forms::{CommentForm, FormErrors};
use crate::models::Comment;
use crate::services::CommentServiceError;
use crate::web::common::{form_context, post_url, see_other};
use crate::web::middleware::{AppState, LoggedIn, Viewer, WebError};
use crate::web::posts::render_detail;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comment/", post(add_comment))
        .route(
            "/posts/{post_id}/edit_comment/{comment_id}/",
            get(edit_comment_form).post(edit_comment_submit),
        )
        .route(
            "/posts/{post_id}/delete_comment/{comment_id}/",
            get(delete_comment_confirm).post(delete_comment_submit),
        )
}

/// POST /posts/{id}/comment/
async fn add_comment(
    State(state): State<AppState>,
    me: LoggedIn,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, WebError> {
    let post = state
        .post_service
        .get_visible(id, Some(&me.user), Utc::now())
        .await?;

    match form.validate() {
        Ok(text) => {
            state.comment_service.add(id, &me.user, &text).await?;
            Ok(see_other(post_url(id)))
        }
        Err(errors) => {
            let viewer = Viewer {
                user: Some(me.user),
                path: post_url(id),
            };
            render_detail(&state, &viewer, &post, &form, &errors).await
        }
    }
}

/// The comment if `me` wrote it, `None` if someone else did
async fn owned_comment(
    state: &AppState,
    post_id: i64,
    comment_id: i64,
    me: &LoggedIn,
) -> Result<Option<Comment>, WebError> {
    match state
        .comment_service
        .get_owned(post_id, comment_id, &me.user)
        .await
    {
        Ok(comment) => Ok(Some(comment)),
        Err(CommentServiceError::NotAuthor(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn render_comment_page(
    state: &AppState,
    me: &LoggedIn,
    mode: &str,
    post_id: i64,
    comment: &Comment,
    form: &CommentForm,
    errors: &FormErrors,
) -> Result<Response, WebError> {
    let mut context = form_context(form, errors);
    context.insert("mode", mode);
    context.insert("post_id", &post_id);
    context.insert("comment", comment);
    state.render(Some(&me.user), &me.path, "blog/comment.html", &context)
}

/// GET /posts/{post_id}/edit_comment/{comment_id}/
async fn edit_comment_form(
    State(state): State<AppState>,
    me: LoggedIn,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, WebError> {
    let Some(comment) = owned_comment(&state, post_id, comment_id, &me).await? else {
        return Ok(see_other(post_url(post_id)));
    };
    let form = CommentForm {
        text: comment.text.clone(),
    };
    render_comment_page(&state, &me, "edit", post_id, &comment, &form, &FormErrors::new())
}

/// POST /posts/{post_id}/edit_comment/{comment_id}/
async fn edit_comment_submit(
    State(state): State<AppState>,
    me: LoggedIn,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, WebError> {
    let Some(comment) = owned_comment(&state, post_id, comment_id, &me).await? else {
        return Ok(see_other(post_url(post_id)));
    };
    match form.validate() {
        Ok(text) => {
            state
                .comment_service
                .update(post_id, comment_id, &me.user, &text)
                .await?;
            Ok(see_other(post_url(post_id)))
        }
        Err(errors) => render_comment_page(&state, &me, "edit", post_id, &comment, &form, &errors),
    }
}

/// GET /posts/{post_id}/delete_comment/{comment_id}/
async fn delete_comment_confirm(
    State(state): State<AppState>,
    me: LoggedIn,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, WebError> {
    let Some(comment) = owned_comment(&state, post_id, comment_id, &me).await? else {
        return Ok(see_other(post_url(post_id)));
    };
    render_comment_page(
        &state,
        &me,
        "delete",
        post_id,
        &comment,
        &CommentForm::default(),
        &FormErrors::new(),
    )
}

/// POST /posts/{post_id}/delete_comment/{comment_id}/
async fn delete_comment_submit(
    State(state): State<AppState>,
    me: LoggedIn,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, WebError> {
    if owned_comment(&state, post_id, comment_id, &me).await?.is_none() {
        return Ok(see_other(post_url(post_id)));
    }
    state
        .comment_service
        .delete(post_id, comment_id, &me.user)
        .await?;
    Ok(see_other(post_url(post_id)))
}
