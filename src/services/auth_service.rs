//! Domain service for accounts and authentication.
//!
//! Handles registration, login (with streak bookkeeping), profile lookup,
//! password changes and bearer token verification.

use thiserror::Error;

use crate::db::StoreError;
use crate::domain::UserId;
use crate::models::{User, UserAchievement};
use crate::services::achievement_service::AchievementError;
use crate::services::token::{AuthUser, TokenError};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The Input Guard flagged a field. Carries the field name only; the
    /// offending value is never echoed back.
    #[error("Suspicious input in field '{field}'")]
    SuspectedInjection { field: &'static str },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Conflict(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] TokenError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Achievement(#[from] AchievementError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Store(other),
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A user together with its achievement rows.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub achievements: Vec<UserAchievement>,
}

/// Outcome of a successful registration or login.
#[derive(Debug, Clone)]
pub struct Session {
    pub profile: UserProfile,
    pub token: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account, grants `first-login` and issues a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SuspectedInjection`] before touching the store if
    /// any field trips the Input Guard, and [`AuthError::Conflict`] if the
    /// username or email is taken.
    async fn register(&self, request: RegisterRequest) -> Result<Session, AuthError>;

    /// Verifies credentials, advances the login streak and issues a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError>;

    async fn current_user(&self, id: UserId) -> Result<UserProfile, AuthError>;

    /// Changes a user's password and grants `security-aware`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if current password is incorrect or new password invalid.
    async fn change_password(
        &self,
        id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Checks a bearer token and returns the identity it carries.
    fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError>;
}
