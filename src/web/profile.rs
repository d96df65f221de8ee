//! Profile pages

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Form, Router,
};
use chrono::Utc;

use crate::forms::{FormErrors, UserForm};
use crate::services::{PostFilter, UserServiceError};
use crate::web::common::{form_context, paged_context, profile_url, see_other, PageQuery};
use crate::web::middleware::{AppState, LoggedIn, Viewer, WebError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/{username}/", get(profile))
        .route("/edit_profile/", get(edit_profile_form).post(edit_profile_submit))
}

/// GET /profile/{username}/
///
/// The owner sees every post they wrote; everyone else only the publicly
/// visible ones.
async fn profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let profile = state.user_service.get_by_username(&username).await?;
    let viewer_id = viewer.user().map(|u| u.id);

    let filter = PostFilter::resolve(Some(profile.id), viewer_id, false, Utc::now());
    let posts = state
        .post_service
        .list_page(&filter.to_query(), query.raw())
        .await?;

    let mut context = paged_context("posts", &posts);
    context.insert("profile", &profile);
    context.insert("is_owner", &(viewer_id == Some(profile.id)));
    state.render(viewer.user(), &viewer.path, "blog/profile.html", &context)
}

/// GET /edit_profile/
async fn edit_profile_form(State(state): State<AppState>, me: LoggedIn) -> Result<Response, WebError> {
    let context = form_context(&UserForm::from_user(&me.user), &FormErrors::new());
    state.render(Some(&me.user), &me.path, "blog/user.html", &context)
}

/// POST /edit_profile/
async fn edit_profile_submit(
    State(state): State<AppState>,
    me: LoggedIn,
    Form(form): Form<UserForm>,
) -> Result<Response, WebError> {
    let errors = match form.validate() {
        Ok(input) => match state.user_service.update_profile(me.user.id, input).await {
            Ok(user) => return Ok(see_other(profile_url(&user.username))),
            Err(UserServiceError::UserExists(_)) => {
                FormErrors::single("username", "A user with that username already exists.")
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let context = form_context(&form, &errors);
    state.render(Some(&me.user), &me.path, "blog/user.html", &context)
}
