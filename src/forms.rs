//! Form binding and validation
//!
//! Every form is a plain `serde` struct filled from an urlencoded body by
//! `axum::Form`. Fields arrive as strings so that a rejected form can be
//! rendered back with exactly what the user typed. `validate` turns a form
//! into the typed input a service expects, or into [`FormErrors`].

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{
    is_valid_slug, Category, CategoryInput, Location, LocationInput, Post, PostInput,
    UpdateProfileInput, User,
};
use crate::services::password::MIN_PASSWORD_LENGTH;
use crate::services::RegisterInput;

/// Format used by `<input type="datetime-local">`
pub const DATETIME_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M";

const ACCEPTED_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

const TITLE_MAX: usize = 256;
const NAME_MAX: usize = 150;

const REQUIRED: &str = "This field is required.";

/// Key for errors that belong to the whole form rather than one field
pub const NON_FIELD_ERRORS: &str = "__all__";

const USERNAME_PATTERN: &str = r"^[\w.@+-]+$";
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Field name → error messages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error against `field`
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// Error for a single field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

fn require<'a>(errors: &mut FormErrors, field: &str, value: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }
    value
}

fn max_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
    }
}

fn checkbox(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some(v) if !v.is_empty() && v != "0" && v != "false")
}

/// Parse a submitted date and time, read as UTC
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    ACCEPTED_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Parse an optional id from a `<select>`; empty means "none"
fn parse_choice(errors: &mut FormErrors, field: &str, raw: &str, known: &[i64]) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(id) if known.contains(&id) => Some(id),
        _ => {
            errors.add(
                field,
                "Select a valid choice. That choice is not one of the available choices.",
            );
            None
        }
    }
}

fn matches_pattern(pattern: &str, value: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(value),
        Err(e) => {
            tracing::error!("Invalid validation pattern {}: {}", pattern, e);
            false
        }
    }
}

fn validate_username(errors: &mut FormErrors, raw: &str) -> String {
    let username = require(errors, "username", raw).to_string();
    if username.is_empty() {
        return username;
    }
    max_length(errors, "username", &username, NAME_MAX);
    if !matches_pattern(USERNAME_PATTERN, &username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    username
}

fn validate_email(errors: &mut FormErrors, raw: &str) -> String {
    let email = raw.trim().to_string();
    if !email.is_empty() && !matches_pattern(EMAIL_PATTERN, &email) {
        errors.add("email", "Enter a valid email address.");
    }
    email
}

// ============================================================================
// Post
// ============================================================================

/// Author-facing post form. The author comes from the session and new posts
/// are published.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pub_date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
}

impl PostForm {
    /// Blank form with the publish date preset to `now`
    pub fn blank(now: DateTime<Utc>) -> Self {
        Self {
            pub_date: now.format(DATETIME_LOCAL_FORMAT).to_string(),
            ..Default::default()
        }
    }

    /// Form prefilled from an existing post
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.format(DATETIME_LOCAL_FORMAT).to_string(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }

    /// Validate against the selectable categories and locations.
    ///
    /// The returned input keeps `is_published = true`; callers editing an
    /// existing post carry its current flag over.
    pub fn validate(
        &self,
        categories: &[Category],
        locations: &[Location],
    ) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::new();

        let title = require(&mut errors, "title", &self.title).to_string();
        max_length(&mut errors, "title", &title, TITLE_MAX);
        let text = require(&mut errors, "text", &self.text).to_string();

        let pub_date = if require(&mut errors, "pub_date", &self.pub_date).is_empty() {
            None
        } else {
            let parsed = parse_datetime(&self.pub_date);
            if parsed.is_none() {
                errors.add("pub_date", "Enter a valid date/time.");
            }
            parsed
        };

        let location_ids: Vec<i64> = locations.iter().map(|l| l.id).collect();
        let location_id = parse_choice(&mut errors, "location", &self.location, &location_ids);

        let category_ids: Vec<i64> = categories.iter().map(|c| c.id).collect();
        let category_id = if require(&mut errors, "category", &self.category).is_empty() {
            None
        } else {
            parse_choice(&mut errors, "category", &self.category, &category_ids)
        };

        match pub_date {
            Some(pub_date) if errors.is_empty() => Ok(PostInput {
                title,
                text,
                pub_date,
                location_id,
                category_id,
                is_published: true,
            }),
            _ => Err(errors),
        }
    }
}

/// Admin post form: the post form plus author and published flag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminPostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pub_date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub is_published: Option<String>,
}

impl AdminPostForm {
    pub fn blank(now: DateTime<Utc>) -> Self {
        Self::with_post_fields(PostForm::blank(now), String::new(), true)
    }

    pub fn from_post(post: &Post) -> Self {
        Self::with_post_fields(
            PostForm::from_post(post),
            post.author_id.to_string(),
            post.is_published,
        )
    }

    fn with_post_fields(post: PostForm, author: String, is_published: bool) -> Self {
        Self {
            title: post.title,
            text: post.text,
            pub_date: post.pub_date,
            location: post.location,
            category: post.category,
            author,
            is_published: is_published.then(|| "on".to_string()),
        }
    }

    fn post_fields(&self) -> PostForm {
        PostForm {
            title: self.title.clone(),
            text: self.text.clone(),
            pub_date: self.pub_date.clone(),
            location: self.location.clone(),
            category: self.category.clone(),
        }
    }

    /// Validate into `(author_id, input)`
    pub fn validate(
        &self,
        users: &[User],
        categories: &[Category],
        locations: &[Location],
    ) -> Result<(i64, PostInput), FormErrors> {
        let mut errors = FormErrors::new();
        let user_ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        let author = if require(&mut errors, "author", &self.author).is_empty() {
            None
        } else {
            parse_choice(&mut errors, "author", &self.author, &user_ids)
        };

        let input = match self.post_fields().validate(categories, locations) {
            Ok(input) => Some(input),
            Err(post_errors) => {
                for (field, messages) in post_errors.0 {
                    for message in messages {
                        errors.add(&field, message);
                    }
                }
                None
            }
        };

        match (author, input) {
            (Some(author), Some(mut input)) if errors.is_empty() => {
                input.is_published = checkbox(&self.is_published);
                Ok((author, input))
            }
            _ => Err(errors),
        }
    }
}

// ============================================================================
// Comment
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let text = require(&mut errors, "text", &self.text).to_string();
        errors.into_result(text)
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Profile editing form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

impl UserForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }

    /// Field-level checks. Username uniqueness is checked by the service.
    pub fn validate(&self) -> Result<UpdateProfileInput, FormErrors> {
        let mut errors = FormErrors::new();

        let first_name = self.first_name.trim().to_string();
        max_length(&mut errors, "first_name", &first_name, NAME_MAX);
        let last_name = self.last_name.trim().to_string();
        max_length(&mut errors, "last_name", &last_name, NAME_MAX);
        let username = validate_username(&mut errors, &self.username);
        let email = validate_email(&mut errors, &self.email);

        errors.into_result(UpdateProfileInput {
            first_name,
            last_name,
            username,
            email,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub password_confirm: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<RegisterInput, FormErrors> {
        let mut errors = FormErrors::new();

        let username = validate_username(&mut errors, &self.username);
        let email = validate_email(&mut errors, &self.email);

        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        } else if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    MIN_PASSWORD_LENGTH
                ),
            );
        }
        if self.password != self.password_confirm {
            errors.add("password_confirm", "The two password fields didn't match.");
        }

        errors.into_result(RegisterInput {
            username,
            email,
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Where to go after logging in
    #[serde(default)]
    pub next: String,
}

impl LoginForm {
    /// Returns `(username, password)`
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let username = require(&mut errors, "username", &self.username).to_string();
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result((username, self.password.clone()))
    }
}

// ============================================================================
// Admin: categories and locations
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub is_published: Option<String>,
}

impl CategoryForm {
    pub fn blank() -> Self {
        Self {
            is_published: Some("on".to_string()),
            ..Default::default()
        }
    }

    pub fn from_category(category: &Category) -> Self {
        Self {
            title: category.title.clone(),
            description: category.description.clone(),
            slug: category.slug.clone(),
            is_published: category.is_published.then(|| "on".to_string()),
        }
    }

    pub fn validate(&self) -> Result<CategoryInput, FormErrors> {
        let mut errors = FormErrors::new();

        let title = require(&mut errors, "title", &self.title).to_string();
        max_length(&mut errors, "title", &title, TITLE_MAX);
        let description = require(&mut errors, "description", &self.description).to_string();
        let slug = require(&mut errors, "slug", &self.slug).to_string();
        if !slug.is_empty() && !is_valid_slug(&slug) {
            errors.add(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            );
        }
        max_length(&mut errors, "slug", &slug, 64);

        errors.into_result(CategoryInput {
            title,
            description,
            slug,
            is_published: checkbox(&self.is_published),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_published: Option<String>,
}

impl LocationForm {
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            is_published: Some("on".to_string()),
        }
    }

    pub fn from_location(location: &Location) -> Self {
        Self {
            name: location.name.clone(),
            is_published: location.is_published.then(|| "on".to_string()),
        }
    }

    pub fn validate(&self) -> Result<LocationInput, FormErrors> {
        let mut errors = FormErrors::new();
        let name = require(&mut errors, "name", &self.name).to_string();
        max_length(&mut errors, "name", &name, TITLE_MAX);
        errors.into_result(LocationInput {
            name,
            is_published: checkbox(&self.is_published),
        })
    }
}

/// Read a repeated-field form body (`Form<Vec<(String, String)>>`) into a map
/// of the last value per key
pub fn pairs_to_map(pairs: &[(String, String)]) -> BTreeMap<String, String> {
    pairs.iter().cloned().collect()
}
