//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They own the
//! rules of the blog:
//! - which posts a viewer may see (`visibility`)
//! - who may change a post or comment
//! - account registration and sessions
//!
//! Each service returns its own `thiserror` enum; repository failures are
//! carried as `InternalError`.

pub mod category;
pub mod comment;
pub mod location;
pub mod password;
pub mod post;
pub mod user;
pub mod visibility;

pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use location::{LocationService, LocationServiceError};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use user::{RegisterInput, UserService, UserServiceError};
pub use visibility::{can_view, is_author, Authored, PostFilter};
