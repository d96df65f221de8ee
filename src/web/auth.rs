//! Registration, login and logout

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use crate::forms::{FormErrors, LoginForm, RegistrationForm, NON_FIELD_ERRORS};
use crate::services::UserServiceError;
use crate::web::common::{form_context, see_other};
use crate::web::middleware::{extract_session_token, AppState, Viewer, WebError, SESSION_COOKIE};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/registration/",
            get(registration_form).post(registration_submit),
        )
        .route("/auth/login/", get(login_form).post(login_submit))
        .route("/auth/logout/", post(logout))
}

#[derive(Debug, Deserialize)]
struct NextQuery {
    next: Option<String>,
}

/// Redirect target after login. Only local absolute paths are followed.
pub fn safe_next(next: &str) -> &str {
    let next = next.trim();
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    if local {
        next
    } else {
        "/"
    }
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// GET /auth/registration/
async fn registration_form(State(state): State<AppState>, viewer: Viewer) -> Result<Response, WebError> {
    let context = form_context(&RegistrationForm::default(), &FormErrors::new());
    state.render(
        viewer.user(),
        &viewer.path,
        "registration/registration_form.html",
        &context,
    )
}

/// POST /auth/registration/
async fn registration_submit(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, WebError> {
    let errors = match form.validate() {
        Ok(input) => match state.user_service.register(input).await {
            Ok(_) => return Ok(see_other("/auth/login/")),
            Err(UserServiceError::UserExists(_)) => {
                FormErrors::single("username", "A user with that username already exists.")
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let context = form_context(&form, &errors);
    state.render(
        viewer.user(),
        &viewer.path,
        "registration/registration_form.html",
        &context,
    )
}

/// GET /auth/login/
async fn login_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> Result<Response, WebError> {
    let form = LoginForm {
        next: query.next.unwrap_or_default(),
        ..Default::default()
    };
    let context = form_context(&form, &FormErrors::new());
    state.render(viewer.user(), &viewer.path, "registration/login.html", &context)
}

/// POST /auth/login/
async fn login_submit(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let errors = match form.validate() {
        Ok((username, password)) => match state.user_service.login(&username, &password).await {
            Ok((session, _user)) => {
                let cookie = session_cookie(&session.id, state.session_ttl_days * 24 * 60 * 60);
                let value = HeaderValue::from_str(&cookie)
                    .map_err(|e| WebError::Internal(anyhow::anyhow!("Invalid session cookie: {}", e)))?;
                let mut response = see_other(safe_next(&form.next));
                response.headers_mut().insert(header::SET_COOKIE, value);
                return Ok(response);
            }
            Err(UserServiceError::AuthenticationError(_)) => FormErrors::single(
                NON_FIELD_ERRORS,
                "Please enter a correct username and password. Note that both fields may be case-sensitive.",
            ),
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let context = form_context(&form, &errors);
    state.render(viewer.user(), &viewer.path, "registration/login.html", &context)
}

/// POST /auth/logout/
async fn logout(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }
    if let Some(user) = viewer.user() {
        tracing::info!(user_id = user.id, "User logged out");
    }

    let page = state.render(
        None,
        &viewer.path,
        "registration/logged_out.html",
        &tera::Context::new(),
    )?;
    Ok(([(header::SET_COOKIE, session_cookie("", 0))], page).into_response())
}
