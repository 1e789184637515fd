//! Domain service for the achievement ledger.
//!
//! Applies progress events to per-user rows and exposes the catalog and the
//! per-user progress listing in display order.

use thiserror::Error;

use crate::db::StoreError;
use crate::domain::{AchievementKind, UserId};
use crate::models::{AchievementDefinition, ProgressRecord, UserAchievement};

#[derive(Debug, Error)]
pub enum AchievementError {
    #[error("Achievement row kept changing underneath the update")]
    Contended,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait::async_trait]
pub trait AchievementService: Send + Sync {
    /// The catalog as stored in the backend.
    async fn catalog(&self) -> Result<Vec<AchievementDefinition>, AchievementError>;

    /// Applies one progress event and returns the row as it now stands.
    ///
    /// Completed rows are frozen: the call leaves them untouched.
    async fn assign(
        &self,
        user_id: UserId,
        achievement: AchievementKind,
        delta: i32,
        force_complete: bool,
    ) -> Result<ProgressRecord, AchievementError>;

    /// Progress rows joined with the catalog, completed first, then by
    /// descending progress.
    async fn user_achievements(
        &self,
        user_id: UserId,
    ) -> Result<Vec<UserAchievement>, AchievementError>;

    /// Counts one high-confidence detection towards `detection-master`.
    async fn record_detection(&self, user_id: UserId) -> Result<ProgressRecord, AchievementError>;

    /// Raises `daily-login` progress to the current streak.
    async fn record_login_streak(
        &self,
        user_id: UserId,
        streak: u32,
    ) -> Result<ProgressRecord, AchievementError>;
}
