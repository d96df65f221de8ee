//! Shared handler utilities

use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::forms::FormErrors;
use crate::models::PagedResult;

/// `?page=` kept as a raw string: a malformed value selects the first page
/// instead of rejecting the request
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn raw(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

/// Context holding one page of a listing as `<name>` and its pager as `page`
pub fn paged_context<T: Serialize>(name: &str, paged: &PagedResult<T>) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert(name, &paged.items);
    context.insert("page", &paged.page_info());
    context
}

/// Context for a form page: submitted values plus errors
pub fn form_context<F: Serialize>(form: &F, errors: &FormErrors) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    context
}

/// 303 to `location`
pub fn see_other(location: impl AsRef<str>) -> Response {
    Redirect::to(location.as_ref()).into_response()
}

pub fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}
