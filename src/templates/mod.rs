//! Template engine
//!
//! Server-side rendering with Tera. The templates under `templates/` are
//! compiled into the binary; an optional override directory can replace any
//! of them by name (`blog/index.html`, `pages/404.html`, ...).

use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera, Value};

mod error;

pub use error::TemplateError;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Placeholder shown for empty optional values
pub const NOT_SET: &str = "Not set";

/// Template engine for rendering pages
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Load the embedded templates, then apply overrides from `override_dir`
    /// when given.
    pub fn new(override_dir: Option<&Path>) -> Result<Self, TemplateError> {
        let mut templates: HashMap<String, String> = HashMap::new();

        for name in EmbeddedTemplates::iter() {
            if let Some(file) = EmbeddedTemplates::get(&name) {
                let content = String::from_utf8_lossy(&file.data).into_owned();
                templates.insert(name.replace('\\', "/"), content);
            }
        }

        if let Some(dir) = override_dir {
            if dir.is_dir() {
                let mut overrides = Vec::new();
                collect_templates_from_dir(dir, dir, &mut overrides)?;
                for (name, content) in overrides {
                    tracing::debug!("Template override: {}", name);
                    templates.insert(name, content);
                }
            } else {
                tracing::warn!(
                    "Template override directory {:?} does not exist, using embedded templates",
                    dir
                );
            }
        }

        let mut tera = Tera::default();
        // Added in one batch so child templates can extend parents regardless of order
        tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())
            .map_err(|e| TemplateError::Load(error_chain(&e)))?;
        tera.register_filter("not_set", not_set_filter);

        tracing::info!(
            "Loaded {} templates",
            tera.get_template_names().count()
        );

        Ok(Self { tera })
    }

    /// Render a template
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, TemplateError> {
        self.tera.render(template, context).map_err(|e| {
            TemplateError::Render(format!("Failed to render '{}': {}", template, error_chain(&e)))
        })
    }

    /// Render a template with the standard variables added to `context`
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String, TemplateError> {
        let mut full_context = context.clone();

        full_context.insert("site_name", &standard_vars.site_name);
        full_context.insert("request_path", &standard_vars.request_path);
        full_context.insert("year", &standard_vars.year);
        full_context.insert("current_user", &standard_vars.current_user);

        self.render(template, &full_context)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    /// Minimal page used when an error page itself fails to render
    pub fn simple_error_page(status: u16, title: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{status} {title}</title>
    <style>
        body {{ font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 50px auto; }}
        h1 {{ color: #e74c3c; }}
    </style>
</head>
<body>
    <h1>{status}</h1>
    <p>{title}</p>
    <p><a href="/">Home</a></p>
</body>
</html>"#
        )
    }
}

/// Recursively collect `.html` files below `current_path`, named relative to
/// `base_path` with forward slashes.
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), TemplateError> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("html") {
            let relative = match path.strip_prefix(base_path) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let name = relative.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)?;
            templates.push((name, content));
        }
    }
    Ok(())
}

fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// `{{ value | not_set }}`: null and empty strings become "Not set"
fn not_set_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value {
        Value::Null => Ok(Value::String(NOT_SET.to_string())),
        Value::String(s) if s.trim().is_empty() => Ok(Value::String(NOT_SET.to_string())),
        other => Ok(other.clone()),
    }
}

/// Variables available to every page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    /// Site name from the configuration
    pub site_name: String,
    /// Logged-in user, if any
    pub current_user: Option<CurrentUser>,
    /// Path of the current request (used for `?next=` links)
    pub request_path: String,
    /// Current year (footer)
    pub year: i32,
}

/// The logged-in user as templates see it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

impl From<&crate::models::User> for CurrentUser {
    fn from(user: &crate::models::User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }
}

impl StandardTemplateVars {
    pub fn new(site_name: impl Into<String>, request_path: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            current_user: None,
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }

    pub fn with_user(mut self, user: CurrentUser) -> Self {
        self.current_user = Some(user);
        self
    }
}
