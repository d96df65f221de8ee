//! Blogicum - a small blogging site
//!
//! Authors publish posts (optionally scheduled for a future date) under
//! categories and locations, readers comment on them, and staff manage
//! everything through the admin screens.

pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod templates;
pub mod web;
