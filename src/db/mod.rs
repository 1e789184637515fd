use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::{AchievementKind, UserId};
use crate::models::{AchievementDefinition, NewUser, ProgressRecord, User, UserAchievement};

pub mod migrator;
pub mod repositories;
mod store;

pub use store::{AchievementStore, Backend, StoreError, UserStore};

/// Embedded backend: a pooled sea-orm connection to a SQLite file.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
        if !path_str.contains(":memory:") {
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn achievement_repo(&self) -> repositories::achievement::AchievementRepository {
        repositories::achievement::AchievementRepository::new(self.conn.clone())
    }
}

#[async_trait]
impl UserStore for Store {
    async fn create_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        self.user_repo().create(user).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.user_repo().get_by_username(username).await
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.user_repo().get_by_id(id).await
    }

    async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, StoreError> {
        self.user_repo().get_by_username_with_password(username).await
    }

    async fn update_login_streak(&self, id: UserId, streak: u32) -> Result<(), StoreError> {
        self.user_repo().update_login_streak(id, streak).await
    }

    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        self.user_repo().update_password_hash(id, password_hash).await
    }

    async fn has_users(&self) -> Result<bool, StoreError> {
        self.user_repo().has_users().await
    }
}

#[async_trait]
impl AchievementStore for Store {
    async fn sync_catalog(&self, catalog: &[AchievementDefinition]) -> Result<(), StoreError> {
        self.achievement_repo().sync_catalog(catalog).await
    }

    async fn list_catalog(&self) -> Result<Vec<AchievementDefinition>, StoreError> {
        self.achievement_repo().list_catalog().await
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        achievement: AchievementKind,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        self.achievement_repo().get(user_id, achievement).await
    }

    async fn insert_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.achievement_repo().insert(record).await
    }

    async fn update_progress(&self, record: &ProgressRecord) -> Result<bool, StoreError> {
        self.achievement_repo().update_if_incomplete(record).await
    }

    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserAchievement>, StoreError> {
        self.achievement_repo().list_for_user(user_id).await
    }
}

#[async_trait]
impl Backend for Store {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::achievement::catalog;

    async fn memory_store() -> Store {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .expect("in-memory store");
        store.sync_catalog(&catalog()).await.expect("catalog");
        store
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let store = memory_store().await;
        store.create_user(new_user("alice")).await.unwrap();

        let same_name = store.create_user(new_user("alice")).await;
        assert!(matches!(same_name, Err(StoreError::Conflict(_))));

        let same_email = store
            .create_user(NewUser {
                username: "alicia".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await;
        assert!(matches!(same_email, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn streak_update_stamps_last_login() {
        let store = memory_store().await;
        let id = store.create_user(new_user("bob")).await.unwrap();

        let fresh = store.get_user_by_id(id).await.unwrap().unwrap();
        assert_eq!(fresh.login_streak, 0);
        assert!(fresh.last_login.is_none());

        store.update_login_streak(id, 3).await.unwrap();
        let updated = store.get_user_by_username("bob").await.unwrap().unwrap();
        assert_eq!(updated.login_streak, 3);
        assert!(updated.last_login.is_some());
    }

    #[tokio::test]
    async fn catalog_sync_is_idempotent() {
        let store = memory_store().await;
        store.sync_catalog(&catalog()).await.unwrap();
        assert_eq!(store.list_catalog().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn completed_rows_reject_updates() {
        let store = memory_store().await;
        let id = store.create_user(new_user("carol")).await.unwrap();

        let record = ProgressRecord {
            user_id: id,
            achievement: AchievementKind::FirstLogin,
            progress: 1,
            completed: true,
            unlocked_at: Some(chrono::Utc::now()),
        };
        store.insert_progress(&record).await.unwrap();

        let reset = ProgressRecord {
            completed: false,
            unlocked_at: None,
            ..record
        };
        assert!(!store.update_progress(&reset).await.unwrap());

        let stored = store
            .get_progress(id, AchievementKind::FirstLogin)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.completed);
        assert!(stored.unlocked_at.is_some());
    }

    #[tokio::test]
    async fn list_progress_joins_catalog() {
        let store = memory_store().await;
        let id = store.create_user(new_user("dave")).await.unwrap();

        store
            .insert_progress(&ProgressRecord {
                user_id: id,
                achievement: AchievementKind::DetectionMaster,
                progress: 4,
                completed: false,
                unlocked_at: None,
            })
            .await
            .unwrap();

        let rows = store.list_progress(id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].achievement_id, AchievementKind::DetectionMaster);
        assert_eq!(rows[0].icon, "fas fa-medal");
    }
}
