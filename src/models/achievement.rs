use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AchievementKind, UserId};

/// Catalog entry as exposed by `GET /api/achievements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

impl From<AchievementKind> for AchievementDefinition {
    fn from(kind: AchievementKind) -> Self {
        Self {
            id: kind.as_str().to_string(),
            name: kind.display_name().to_string(),
            description: kind.description().to_string(),
            icon: kind.icon().to_string(),
        }
    }
}

/// The static catalog seeded into every backend at startup.
#[must_use]
pub fn catalog() -> Vec<AchievementDefinition> {
    AchievementKind::ALL
        .into_iter()
        .map(AchievementDefinition::from)
        .collect()
}

/// One persisted (user, achievement) progress row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub achievement: AchievementKind,
    pub progress: i32,
    pub completed: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// A progress row joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAchievement {
    pub achievement_id: AchievementKind,
    pub user_id: UserId,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub progress: i32,
    pub completed: bool,
    pub name: String,
    pub description: String,
    pub icon: String,
}

impl UserAchievement {
    #[must_use]
    pub fn from_record(record: ProgressRecord, definition: Option<&AchievementDefinition>) -> Self {
        let kind = record.achievement;
        let (name, description, icon) = definition.map_or_else(
            || {
                (
                    kind.display_name().to_string(),
                    kind.description().to_string(),
                    kind.icon().to_string(),
                )
            },
            |d| (d.name.clone(), d.description.clone(), d.icon.clone()),
        );

        Self {
            achievement_id: kind,
            user_id: record.user_id,
            unlocked_at: record.unlocked_at,
            progress: record.progress,
            completed: record.completed,
            name,
            description,
            icon,
        }
    }
}
