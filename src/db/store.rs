//! Storage abstraction shared by the embedded and remote backends.
//!
//! Handlers and services only see these traits; which backend sits behind
//! them is decided once, at startup, from `storage.backend`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{AchievementKind, UserId};
use crate::models::{AchievementDefinition, NewUser, ProgressRecord, User, UserAchievement};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Failed to decode stored value: {0}")]
    Decode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(msg)) => Self::Conflict(msg),
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for StoreError {
    fn from(err: chrono::ParseError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<crate::domain::UnknownAchievement> for StoreError {
    fn from(err: crate::domain::UnknownAchievement) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Persistence of user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a user and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the username or email is taken.
    async fn create_user(&self, user: NewUser) -> Result<UserId, StoreError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Looks up a user together with its password hash.
    async fn get_credentials(&self, username: &str)
    -> Result<Option<(User, String)>, StoreError>;

    /// Sets the streak and stamps `last_login` with the current time.
    async fn update_login_streak(&self, id: UserId, streak: u32) -> Result<(), StoreError>;

    async fn update_password_hash(&self, id: UserId, password_hash: &str)
    -> Result<(), StoreError>;

    async fn has_users(&self) -> Result<bool, StoreError>;
}

/// Persistence of the achievement catalog and per-user progress rows.
#[async_trait]
pub trait AchievementStore: Send + Sync {
    /// Inserts missing catalog entries and refreshes existing ones.
    async fn sync_catalog(&self, catalog: &[AchievementDefinition]) -> Result<(), StoreError>;

    async fn list_catalog(&self) -> Result<Vec<AchievementDefinition>, StoreError>;

    async fn get_progress(
        &self,
        user_id: UserId,
        achievement: AchievementKind,
    ) -> Result<Option<ProgressRecord>, StoreError>;

    async fn insert_progress(&self, record: &ProgressRecord) -> Result<(), StoreError>;

    /// Overwrites a row in a single statement that only matches while the
    /// stored row is still incomplete. Returns whether a row was written.
    async fn update_progress(&self, record: &ProgressRecord) -> Result<bool, StoreError>;

    /// Progress rows of one user joined with their catalog entries, unordered.
    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserAchievement>, StoreError>;
}

/// A complete storage backend.
#[async_trait]
pub trait Backend: UserStore + AchievementStore {
    fn name(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;
}
