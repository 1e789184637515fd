use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::constants::achievements::DAILY_LOGIN_TARGET;
use crate::db::{AchievementStore, Backend, StoreError};
use crate::domain::ledger::{self, LedgerAction, ProgressEvent};
use crate::domain::{AchievementKind, UserId};
use crate::models::{AchievementDefinition, ProgressRecord, UserAchievement};
use crate::services::achievement_service::{AchievementError, AchievementService};

/// Attempts before giving up on a row that keeps moving between the read
/// and the conditional write.
const MAX_ATTEMPTS: usize = 3;

pub struct DefaultAchievementService {
    store: Arc<dyn Backend>,
}

impl DefaultAchievementService {
    #[must_use]
    pub fn new(store: Arc<dyn Backend>) -> Self {
        Self { store }
    }

    /// Read, transition, conditional write. `delta_for` receives the stored
    /// progress (0 when no row exists) so callers can express absolute
    /// targets as deltas.
    async fn apply(
        &self,
        user_id: UserId,
        achievement: AchievementKind,
        force_complete: bool,
        delta_for: impl Fn(i32) -> i32 + Send + Sync,
    ) -> Result<ProgressRecord, AchievementError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let existing = self.store.get_progress(user_id, achievement).await?;
            let event = ProgressEvent {
                user_id,
                achievement,
                delta: delta_for(existing.as_ref().map_or(0, |r| r.progress)),
                force_complete,
            };
            let step = ledger::advance(existing, event, chrono::Utc::now());

            let written = match step.action {
                LedgerAction::Unchanged => return Ok(step.record),
                LedgerAction::Insert => match self.store.insert_progress(&step.record).await {
                    Ok(()) => true,
                    Err(StoreError::Conflict(_)) => false,
                    Err(e) => return Err(e.into()),
                },
                LedgerAction::Update => self.store.update_progress(&step.record).await?,
            };

            if written {
                if step.newly_completed {
                    info!(
                        user_id = %user_id,
                        achievement = %achievement,
                        progress = step.record.progress,
                        "Achievement unlocked"
                    );
                    metrics::counter!("achievements_unlocked_total", "achievement" => achievement.as_str())
                        .increment(1);
                }
                return Ok(step.record);
            }

            debug!(
                user_id = %user_id,
                achievement = %achievement,
                attempt,
                "Achievement row changed concurrently, retrying"
            );
        }

        Err(AchievementError::Contended)
    }
}

/// Completed first, then higher progress, then catalog order.
fn display_order(a: &UserAchievement, b: &UserAchievement) -> Ordering {
    b.completed
        .cmp(&a.completed)
        .then_with(|| b.progress.cmp(&a.progress))
        .then_with(|| a.achievement_id.cmp(&b.achievement_id))
}

#[async_trait]
impl AchievementService for DefaultAchievementService {
    async fn catalog(&self) -> Result<Vec<AchievementDefinition>, AchievementError> {
        Ok(self.store.list_catalog().await?)
    }

    async fn assign(
        &self,
        user_id: UserId,
        achievement: AchievementKind,
        delta: i32,
        force_complete: bool,
    ) -> Result<ProgressRecord, AchievementError> {
        self.apply(user_id, achievement, force_complete, |_| delta)
            .await
    }

    async fn user_achievements(
        &self,
        user_id: UserId,
    ) -> Result<Vec<UserAchievement>, AchievementError> {
        let mut rows = self.store.list_progress(user_id).await?;
        rows.sort_by(display_order);
        Ok(rows)
    }

    async fn record_detection(&self, user_id: UserId) -> Result<ProgressRecord, AchievementError> {
        self.assign(user_id, AchievementKind::DetectionMaster, 1, false)
            .await
    }

    async fn record_login_streak(
        &self,
        user_id: UserId,
        streak: u32,
    ) -> Result<ProgressRecord, AchievementError> {
        let streak = i32::try_from(streak).unwrap_or(i32::MAX);
        self.apply(
            user_id,
            AchievementKind::DailyLogin,
            streak >= DAILY_LOGIN_TARGET,
            move |current| streak.saturating_sub(current).max(0),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AchievementStore, Store, UserStore};
    use crate::models::NewUser;
    use crate::models::achievement::catalog;

    async fn setup() -> (DefaultAchievementService, UserId) {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        store.sync_catalog(&catalog()).await.unwrap();
        let user_id = store
            .create_user(NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (DefaultAchievementService::new(Arc::new(store)), user_id)
    }

    #[tokio::test]
    async fn test_detection_master_unlocks_on_tenth_event() {
        let (service, user) = setup().await;

        for call in 1..=9 {
            let record = service.record_detection(user).await.unwrap();
            assert_eq!(record.progress, call);
            assert!(!record.completed);
            assert!(record.unlocked_at.is_none());
        }

        let tenth = service.record_detection(user).await.unwrap();
        assert_eq!(tenth.progress, 10);
        assert!(tenth.completed);
        assert!(tenth.unlocked_at.is_some());

        let eleventh = service.record_detection(user).await.unwrap();
        assert_eq!(eleventh, tenth);
    }

    #[tokio::test]
    async fn test_completed_rows_are_frozen() {
        let (service, user) = setup().await;

        let first = service
            .assign(user, AchievementKind::FirstLogin, 1, true)
            .await
            .unwrap();
        assert!(first.completed);

        let again = service
            .assign(user, AchievementKind::FirstLogin, 5, false)
            .await
            .unwrap();
        assert_eq!(again, first);
    }

    #[tokio::test]
    async fn test_negative_delta_never_lowers_progress() {
        let (service, user) = setup().await;

        service
            .assign(user, AchievementKind::DetectionMaster, 4, false)
            .await
            .unwrap();
        let record = service
            .assign(user, AchievementKind::DetectionMaster, -3, false)
            .await
            .unwrap();
        assert_eq!(record.progress, 4);
    }

    #[tokio::test]
    async fn test_login_streak_feeds_daily_login() {
        let (service, user) = setup().await;

        let record = service.record_login_streak(user, 1).await.unwrap();
        assert_eq!(record.progress, 1);

        let record = service.record_login_streak(user, 3).await.unwrap();
        assert_eq!(record.progress, 3);
        assert!(!record.completed);

        // A reset streak keeps the best progress so far.
        let record = service.record_login_streak(user, 1).await.unwrap();
        assert_eq!(record.progress, 3);

        let record = service.record_login_streak(user, 5).await.unwrap();
        assert_eq!(record.progress, 5);
        assert!(record.completed);
    }

    #[tokio::test]
    async fn test_user_achievements_display_order() {
        let (service, user) = setup().await;

        service
            .assign(user, AchievementKind::DetectionMaster, 7, false)
            .await
            .unwrap();
        service
            .assign(user, AchievementKind::DailyLogin, 2, false)
            .await
            .unwrap();
        service
            .assign(user, AchievementKind::FirstLogin, 1, true)
            .await
            .unwrap();

        let rows = service.user_achievements(user).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.achievement_id).collect();
        assert_eq!(
            ids,
            vec![
                AchievementKind::FirstLogin,
                AchievementKind::DetectionMaster,
                AchievementKind::DailyLogin,
            ]
        );
    }

    #[tokio::test]
    async fn test_catalog_lists_five_entries() {
        let (service, _) = setup().await;
        assert_eq!(service.catalog().await.unwrap().len(), 5);
    }
}
