//! Web middleware and extractors
//!
//! Contains:
//! - `AppState` shared by every handler
//! - Optional authentication (session cookie or Bearer token)
//! - `Viewer` / `LoggedIn` / `Staff` extractors
//! - `WebError` and the middleware that turns error statuses into HTML pages

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::models::User;
use crate::services::{
    CategoryService, CategoryServiceError, CommentService, CommentServiceError, LocationService,
    LocationServiceError, PostService, PostServiceError, UserService, UserServiceError,
};
use crate::templates::{CurrentUser, StandardTemplateVars, TemplateEngine, TemplateError};

/// Name of the login cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub category_service: Arc<CategoryService>,
    pub location_service: Arc<LocationService>,
    pub templates: Arc<TemplateEngine>,
    pub site_name: Arc<str>,
    /// Login cookie lifetime, in days
    pub session_ttl_days: i64,
}

impl AppState {
    /// Standard template variables for a request
    pub fn template_vars(&self, user: Option<&User>, path: &str) -> StandardTemplateVars {
        let vars = StandardTemplateVars::new(self.site_name.as_ref(), path);
        match user {
            Some(user) => vars.with_user(CurrentUser::from(user)),
            None => vars,
        }
    }

    /// Render a full page
    pub fn render(
        &self,
        user: Option<&User>,
        path: &str,
        template: &str,
        context: &TeraContext,
    ) -> Result<Response, WebError> {
        let vars = self.template_vars(user, path);
        let html = self
            .templates
            .render_with_standard_vars(template, context, &vars)?;
        Ok(Html(html).into_response())
    }
}

/// User resolved by `optional_auth`, stored in request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

// ============================================================================
// Errors
// ============================================================================

/// Errors a handler can end with
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    /// Anonymous request to a page that needs a login; carries the path to
    /// come back to
    #[error("Login required")]
    LoginRequired(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Marker left on error responses; `error_pages` replaces their body
#[derive(Debug, Clone, Copy)]
pub struct ErrorPage;

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match self {
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::Forbidden => StatusCode::FORBIDDEN,
            WebError::LoginRequired(next) => {
                return Redirect::to(&login_url(&next)).into_response();
            }
            WebError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let mut response = status.into_response();
        response.extensions_mut().insert(ErrorPage);
        response
    }
}

impl From<TemplateError> for WebError {
    fn from(e: TemplateError) -> Self {
        WebError::Internal(e.into())
    }
}

impl From<PostServiceError> for WebError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound => WebError::NotFound,
            PostServiceError::NotAuthor(_) => WebError::Forbidden,
            PostServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<CommentServiceError> for WebError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound => WebError::NotFound,
            CommentServiceError::NotAuthor(_) => WebError::Forbidden,
            CommentServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<CategoryServiceError> for WebError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound => WebError::NotFound,
            CategoryServiceError::SlugTaken(slug) => {
                WebError::Internal(anyhow::anyhow!("Slug '{}' is already in use", slug))
            }
            CategoryServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<LocationServiceError> for WebError {
    fn from(e: LocationServiceError) -> Self {
        match e {
            LocationServiceError::NotFound => WebError::NotFound,
            LocationServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<UserServiceError> for WebError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::NotFound => WebError::NotFound,
            UserServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}

/// `/auth/login/?next=<path>`
pub fn login_url(next: &str) -> String {
    format!("/auth/login/?next={}", urlencoding::encode(next))
}

// ============================================================================
// Authentication
// ============================================================================

/// Session token of a request: `Authorization: Bearer` first, then the
/// `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Optional authentication middleware
///
/// Resolves the session to a user and stores it in the request extensions.
/// Unknown or expired sessions leave the request anonymous.
pub async fn optional_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    if let Some(token) = extract_session_token(&parts.headers) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                parts.extensions.insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(Request::from_parts(parts, body)).await
}

/// Replace the body of error responses with the rendered error page
pub async fn error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|au| au.0.clone());
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    if response.extensions().get::<ErrorPage>().is_none() {
        return response;
    }

    let status = response.status();
    let template = format!("pages/{}.html", status.as_u16());
    let vars = state.template_vars(user.as_ref(), &path);
    let html = match state
        .templates
        .render_with_standard_vars(&template, &TeraContext::new(), &vars)
    {
        Ok(html) => html,
        Err(e) => {
            tracing::error!("Failed to render error page {}: {}", template, e);
            TemplateEngine::simple_error_page(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Error"),
            )
        }
    };
    (status, Html(html)).into_response()
}

// ============================================================================
// Extractors
// ============================================================================

fn path_and_query(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string())
}

fn authenticated_user(parts: &Parts) -> Option<User> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .map(|au| au.0.clone())
}

/// Whoever is looking at the page, logged in or not
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user: Option<User>,
    /// Path and query of the request
    pub path: String,
}

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer {
            user: authenticated_user(parts),
            path: path_and_query(parts),
        })
    }
}

/// A logged-in user; anonymous requests are sent to the login page
#[derive(Debug, Clone)]
pub struct LoggedIn {
    pub user: User,
    pub path: String,
}

impl<S> FromRequestParts<S> for LoggedIn
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let path = path_and_query(parts);
        match authenticated_user(parts) {
            Some(user) => Ok(LoggedIn { user, path }),
            None => Err(WebError::LoginRequired(path)),
        }
    }
}

/// A logged-in staff member; other users get 403
#[derive(Debug, Clone)]
pub struct Staff {
    pub user: User,
    pub path: String,
}

impl<S> FromRequestParts<S> for Staff
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let LoggedIn { user, path } = LoggedIn::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(WebError::Forbidden);
        }
        Ok(Staff { user, path })
    }
}
