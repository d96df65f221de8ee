//! User service
//!
//! Business logic for accounts and login state:
//! - registration (the first account becomes staff)
//! - login/logout backed by database sessions
//! - session validation for the auth middleware
//! - profile editing

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, UpdateProfileInput, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Wrong username or password
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Username already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    /// No such user
    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for [`UserService::register`]; already validated by the form
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_ttl_days: i64,
}

impl UserService {
    /// Create a new user service with the default session lifetime
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_ttl(user_repo, session_repo, DEFAULT_SESSION_TTL_DAYS)
    }

    /// Create a new user service with a custom session lifetime
    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_ttl_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl_days,
        }
    }

    /// Register a new account.
    ///
    /// The first account ever created is made staff so that somebody can
    /// reach the admin screens.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        if self
            .user_repo
            .exists_by_username(&input.username)
            .await
            .context("Failed to check username")?
        {
            return Err(UserServiceError::UserExists(input.username));
        }

        let is_staff = self.is_first_user().await?;
        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = User::new(input.username, input.email, password_hash, is_staff);
        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(
            user_id = created.id,
            username = %created.username,
            is_staff = created.is_staff,
            "User registered"
        );
        Ok(created)
    }

    /// Check credentials and open a new session
    pub async fn login(&self, username: &str, password: &str) -> Result<(Session, User), UserServiceError> {
        let invalid = || {
            UserServiceError::AuthenticationError("Invalid username or password".to_string())
        };

        let user = match self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
        {
            Some(user) => user,
            None => {
                tracing::debug!(username, "Login failed: unknown user");
                return Err(invalid());
            }
        };

        let password_valid =
            verify_password(password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(user_id = user.id, "Login failed: wrong password");
            return Err(invalid());
        }

        let session = Session::start(user.id, self.session_ttl_days);
        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((session, user))
    }

    /// Invalidate a session
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown and expired sessions yield `None`; expired ones are removed.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to remove expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    /// True while no account exists
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        Ok(count == 0)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?)
    }

    /// Look up a profile owner; missing users are `NotFound`
    pub async fn get_by_username(&self, username: &str) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
            .ok_or(UserServiceError::NotFound)
    }

    pub async fn count(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count().await.context("Failed to count users")?)
    }

    /// All accounts, for the admin author picker
    pub async fn list(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.user_repo.list().await.context("Failed to list users")?)
    }

    /// Replace the profile fields of `user_id`.
    ///
    /// The new username must not belong to another account.
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        if let Some(existing) = self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
        {
            if existing.id != user_id {
                return Err(UserServiceError::UserExists(input.username));
            }
        }

        let updated = self
            .user_repo
            .update_profile(user_id, &input)
            .await
            .context("Failed to update profile")?;
        Ok(updated)
    }

    /// Remove expired sessions, returning how many were deleted
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    fn register_input(username: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_user_becomes_staff() {
        let service = setup_service().await;

        let first = service.register(register_input("admin")).await.unwrap();
        let second = service.register(register_input("reader")).await.unwrap();

        assert!(first.is_staff);
        assert!(!second.is_staff);
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let service = setup_service().await;
        service.register(register_input("taken")).await.unwrap();

        let result = service.register(register_input("taken")).await;

        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let service = setup_service().await;
        let user = service.register(register_input("alice")).await.unwrap();

        let (session, logged_in) = service.login("alice", "password123").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let resolved = service
            .validate_session(&session.id)
            .await
            .unwrap()
            .expect("session should resolve");
        assert_eq!(resolved.username, "alice");

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let service = setup_service().await;
        service.register(register_input("bob")).await.unwrap();

        let wrong_password = service.login("bob", "nope-nope").await;
        let unknown_user = service.login("nobody", "password123").await;

        assert!(matches!(wrong_password, Err(UserServiceError::AuthenticationError(_))));
        assert!(matches!(unknown_user, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_expired_session_is_ignored() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        // A negative lifetime yields sessions that are already expired.
        let service = UserService::with_session_ttl(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            -1,
        );
        service.register(register_input("carol")).await.unwrap();

        let (session, _) = service.login("carol", "password123").await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_username() {
        let service = setup_service().await;
        let alice = service.register(register_input("alice")).await.unwrap();
        service.register(register_input("bob")).await.unwrap();

        let taken = service
            .update_profile(
                alice.id,
                UpdateProfileInput {
                    username: "bob".into(),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(taken, Err(UserServiceError::UserExists(_))));

        let renamed = service
            .update_profile(
                alice.id,
                UpdateProfileInput {
                    first_name: "Alice".into(),
                    username: "alice".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.first_name, "Alice");
        assert_eq!(renamed.email, "");
    }

    #[tokio::test]
    async fn test_get_by_username_not_found() {
        let service = setup_service().await;
        assert!(matches!(
            service.get_by_username("ghost").await,
            Err(UserServiceError::NotFound)
        ));
    }
}
