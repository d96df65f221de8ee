//! Data models
//!
//! Plain data structures shared by the repositories, services and handlers:
//! - Database entities (User, Session, Category, Location, Post, Comment)
//! - Inputs for create/update operations
//! - Pagination and listing filters

mod category;
mod comment;
mod location;
mod pagination;
mod post;
mod session;
mod user;

pub use category::{is_valid_slug, Category, CategoryInput};
pub use comment::{Comment, CommentWithAuthor};
pub use location::{Location, LocationInput};
pub use pagination::{ListParams, PageInfo, PagedResult};
pub use post::{
    is_publicly_visible, CategoryRef, LocationRef, Post, PostDetails, PostInput, PostQuery,
};
pub use session::Session;
pub use user::{UpdateProfileInput, User};
