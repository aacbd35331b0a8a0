use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{self, password};
use crate::config::SecurityConfig;
use crate::database::models::{NewUser, User};
use crate::database::Store;
use crate::services::validate::{validate_email_format, validate_password_strength};
use crate::services::ServiceError;

const INVALID_CREDENTIALS: &str = "invalid email or password";

/// An authenticated user together with a freshly issued token
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    security: SecurityConfig,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    pub fn security(&self) -> &SecurityConfig {
        &self.security
    }

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<Session, ServiceError> {
        let email = email.trim().to_lowercase();
        let username = username.trim();
        let password = password.trim();

        if email.is_empty() || username.is_empty() || password.is_empty() {
            return Err(ServiceError::invalid(
                "email, username and password are required",
            ));
        }
        validate_email_format(&email)?;
        validate_password_strength(password, self.security.password_min_length)?;

        let existing = self
            .store
            .find_users_by_username_or_email(username, &email)
            .await?;
        if !existing.is_empty() {
            return Err(ServiceError::Conflict(
                "user with this email or username already exists".to_string(),
            ));
        }

        let password_hash = password::hash_password(password, self.security.password_hash_cost)
            .map_err(|e| {
                tracing::error!("Password hashing failed: {}", e);
                ServiceError::Internal("failed to store credentials".to_string())
            })?;

        let user = self
            .store
            .create_user(NewUser {
                email,
                username: username.to_string(),
                password_hash,
            })
            .await?;

        info!("Registered user {} ({})", user.id, user.username);
        self.session_for(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::invalid("email and password are required"));
        }

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            warn!("Login failed: unknown email");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        };

        let matches = password::verify_password(password.trim(), &user.password_hash)
            .map_err(|e| {
                tracing::error!("Password verification failed for user {}: {}", user.id, e);
                ServiceError::Internal("failed to verify credentials".to_string())
            })?;
        if !matches {
            warn!("Login failed for user {}", user.id);
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        self.session_for(user)
    }

    /// Resolves a session token to a user that still exists
    pub async fn authenticate(&self, token: &str) -> Result<User, ServiceError> {
        let claims = auth::validate_jwt(token, &self.security).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            ServiceError::Unauthenticated("invalid or expired token".to_string())
        })?;

        self.store
            .find_user_by_id(claims.user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthenticated("user no longer exists".to_string()))
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, ServiceError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user with id {} not found", user_id)))
    }

    fn session_for(&self, user: User) -> Result<Session, ServiceError> {
        let token = auth::generate_jwt(user.id, &self.security).map_err(|e| {
            tracing::error!("Token generation failed: {}", e);
            ServiceError::Internal("failed to issue session token".to_string())
        })?;
        Ok(Session { user, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;

    fn service() -> UserService {
        let mut security = AppConfig::development().security;
        security.password_hash_cost = 4;
        UserService::new(Arc::new(MemoryStore::new()), security)
    }

    #[tokio::test]
    async fn register_normalizes_and_issues_token() {
        let users = service();
        let session = users
            .register("  Ada@Example.COM ", " ada ", "Secret@1")
            .await
            .unwrap();

        assert_eq!(session.user.email, "ada@example.com");
        assert_eq!(session.user.username, "ada");
        let resolved = users.authenticate(&session.token).await.unwrap();
        assert_eq!(resolved.id, session.user.id);
    }

    #[tokio::test]
    async fn stored_password_is_a_bcrypt_hash() {
        let users = service();
        let session = users.register("ada@example.com", "ada", "Secret@1").await.unwrap();

        let stored = users
            .store
            .find_user_by_id(session.user.id)
            .await
            .unwrap()
            .unwrap()
            .password_hash;
        assert!(stored.starts_with("$2"));
        assert!(password::verify_password("Secret@1", &stored).unwrap());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_and_keeps_original() {
        let users = service();
        users.register("ada@example.com", "ada", "Secret@1").await.unwrap();

        let err = users
            .register("ada@example.com", "other", "Other@123")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = users
            .register("other@example.com", "ada", "Other@123")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        assert!(users.login("ada@example.com", "Secret@1").await.is_ok());
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let users = service();
        users.register("ada@example.com", "ada", "Secret@1").await.unwrap();

        let unknown = users.login("nobody@example.com", "Secret@1").await.unwrap_err();
        let wrong = users.login("ada@example.com", "Wrong@1").await.unwrap_err();
        assert_eq!(unknown, wrong);
        assert_eq!(wrong, ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let users = service();
        assert!(matches!(
            users.register("", "ada", "Secret@1").await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            users.register("not-an-email", "ada", "Secret@1").await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            users.register("ada@example.com", "ada", "weak").await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let users = service();
        assert!(matches!(
            users.authenticate("not.a.jwt").await,
            Err(ServiceError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn token_for_missing_user_is_unauthenticated() {
        let users = service();
        let token = auth::generate_jwt(404, users.security()).unwrap();
        assert!(matches!(
            users.authenticate(&token).await,
            Err(ServiceError::Unauthenticated(_))
        ));
    }
}
