//! Template engine error types

use thiserror::Error;

/// Template loading and rendering errors
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template source could not be parsed, or an inheritance chain is broken
    #[error("Failed to load templates: {0}")]
    Load(String),

    /// Rendering failed (missing variable, bad filter argument, ...)
    #[error("Template error: {0}")]
    Render(String),

    /// IO error while reading the override directory
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
