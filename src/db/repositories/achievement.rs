use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::{Expr, OnConflict},
};
use tracing::warn;

use super::parse_timestamp;
use crate::db::StoreError;
use crate::domain::{AchievementKind, UserId};
use crate::entities::{achievements, user_achievements};
use crate::models::{AchievementDefinition, ProgressRecord, UserAchievement};

impl From<achievements::Model> for AchievementDefinition {
    fn from(model: achievements::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            icon: model.icon,
        }
    }
}

impl TryFrom<user_achievements::Model> for ProgressRecord {
    type Error = StoreError;

    fn try_from(model: user_achievements::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::new(model.user_id),
            achievement: model.achievement_id.parse()?,
            progress: model.progress,
            completed: model.completed,
            unlocked_at: model.unlocked_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

pub struct AchievementRepository {
    conn: DatabaseConnection,
}

impl AchievementRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn sync_catalog(&self, catalog: &[AchievementDefinition]) -> Result<(), StoreError> {
        if catalog.is_empty() {
            return Ok(());
        }

        let models = catalog.iter().map(|d| achievements::ActiveModel {
            id: Set(d.id.clone()),
            name: Set(d.name.clone()),
            description: Set(d.description.clone()),
            icon: Set(d.icon.clone()),
        });

        achievements::Entity::insert_many(models)
            .on_conflict(
                OnConflict::column(achievements::Column::Id)
                    .update_columns([
                        achievements::Column::Name,
                        achievements::Column::Description,
                        achievements::Column::Icon,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn list_catalog(&self) -> Result<Vec<AchievementDefinition>, StoreError> {
        let rows = achievements::Entity::find().all(&self.conn).await?;
        Ok(rows.into_iter().map(AchievementDefinition::from).collect())
    }

    pub async fn get(
        &self,
        user_id: UserId,
        achievement: AchievementKind,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        user_achievements::Entity::find_by_id((user_id.value(), achievement.as_str().to_string()))
            .one(&self.conn)
            .await?
            .map(ProgressRecord::try_from)
            .transpose()
    }

    pub async fn insert(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        let active = user_achievements::ActiveModel {
            user_id: Set(record.user_id.value()),
            achievement_id: Set(record.achievement.as_str().to_string()),
            progress: Set(record.progress),
            completed: Set(record.completed),
            unlocked_at: Set(record.unlocked_at.map(|t| t.to_rfc3339())),
        };

        active.insert(&self.conn).await?;
        Ok(())
    }

    pub async fn update_if_incomplete(&self, record: &ProgressRecord) -> Result<bool, StoreError> {
        let result = user_achievements::Entity::update_many()
            .col_expr(user_achievements::Column::Progress, Expr::value(record.progress))
            .col_expr(user_achievements::Column::Completed, Expr::value(record.completed))
            .col_expr(
                user_achievements::Column::UnlockedAt,
                Expr::value(record.unlocked_at.map(|t| t.to_rfc3339())),
            )
            .filter(user_achievements::Column::UserId.eq(record.user_id.value()))
            .filter(user_achievements::Column::AchievementId.eq(record.achievement.as_str()))
            .filter(user_achievements::Column::Completed.eq(false))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<UserAchievement>, StoreError> {
        let rows = user_achievements::Entity::find()
            .filter(user_achievements::Column::UserId.eq(user_id.value()))
            .find_also_related(achievements::Entity)
            .all(&self.conn)
            .await?;

        let mut joined = Vec::with_capacity(rows.len());
        for (progress, definition) in rows {
            let achievement_id = progress.achievement_id.clone();
            match ProgressRecord::try_from(progress) {
                Ok(record) => {
                    let definition = definition.map(AchievementDefinition::from);
                    joined.push(UserAchievement::from_record(record, definition.as_ref()));
                }
                Err(e) => warn!(
                    user_id = %user_id,
                    achievement_id = %achievement_id,
                    error = %e,
                    "Skipping unreadable achievement row"
                ),
            }
        }

        Ok(joined)
    }
}
