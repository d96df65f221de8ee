//! User model
//!
//! Registered accounts. Users own posts and comments; staff users may also
//! open the admin screens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique, used in profile URLs)
    pub username: String,
    /// Email address (may be empty)
    pub email: String,
    /// Given name (may be empty)
    pub first_name: String,
    /// Family name (may be empty)
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the user may use the admin screens
    pub is_staff: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed, see `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String, is_staff: bool) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            first_name: String::new(),
            last_name: String::new(),
            password_hash,
            is_staff,
            created_at: now,
            updated_at: now,
        }
    }

    /// "First Last" when either part is set, otherwise the username
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Editable profile fields
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "testuser".to_string(),
            "test@example.com".to_string(),
            "hashed_password".to_string(),
            false,
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.username, "testuser");
        assert!(!user.is_staff);
        assert!(user.first_name.is_empty());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = User::new("bob".into(), String::new(), "hash".into(), false);
        assert_eq!(user.display_name(), "bob");

        user.first_name = "Bob".into();
        assert_eq!(user.display_name(), "Bob");

        user.last_name = "Smith".into();
        assert_eq!(user.display_name(), "Bob Smith");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("bob".into(), String::new(), "secret-hash".into(), false);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
