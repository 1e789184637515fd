//! Remote backend over a hosted Postgres exposed through PostgREST (Supabase).
//!
//! Tables are expected to exist already with the same logical schema as the
//! embedded backend (`users`, `achievements`, `user_achievements`); only the
//! achievement catalog is upserted at startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::db::{AchievementStore, Backend, StoreError, UserStore};
use crate::domain::{AchievementKind, UserId};
use crate::models::{AchievementDefinition, NewUser, ProgressRecord, User, UserAchievement};

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,

    pub key: String,

    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    login_streak: Option<i32>,
}

impl UserRow {
    fn into_parts(self) -> (User, Option<String>) {
        let user = User {
            id: UserId::new(self.id),
            username: self.username,
            email: self.email,
            created_at: self.created_at,
            last_login: self.last_login,
            login_streak: self
                .login_streak
                .and_then(|s| u32::try_from(s).ok())
                .unwrap_or(0),
        };
        (user, self.password)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProgressRow {
    user_id: i32,
    achievement_id: String,
    progress: i32,
    completed: bool,
    unlocked_at: Option<DateTime<Utc>>,
}

impl From<&ProgressRecord> for ProgressRow {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            user_id: record.user_id.value(),
            achievement_id: record.achievement.as_str().to_string(),
            progress: record.progress,
            completed: record.completed,
            unlocked_at: record.unlocked_at,
        }
    }
}

impl TryFrom<ProgressRow> for ProgressRecord {
    type Error = StoreError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::new(row.user_id),
            achievement: row.achievement_id.parse()?,
            progress: row.progress,
            completed: row.completed,
            unlocked_at: row.unlocked_at,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    rest_base: Url,
    key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> anyhow::Result<Self> {
        let base = format!("{}/", config.url.trim_end_matches('/'));
        let rest_base = Url::parse(&base)
            .and_then(|u| u.join("rest/v1/"))
            .map_err(|e| anyhow::anyhow!("Invalid Supabase URL '{}': {e}", config.url))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("deepguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build Supabase HTTP client: {e}"))?;

        Ok(Self {
            client,
            rest_base,
            key: config.key.clone(),
        })
    }

    fn table_url(&self, table: &str, params: &[(&str, String)]) -> Result<Url, StoreError> {
        let mut url = self
            .rest_base
            .join(table)
            .map_err(|e| StoreError::Internal(format!("Invalid table URL: {e}")))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error: PostgrestError = serde_json::from_str(&body).unwrap_or_default();
        debug!(status = %status, body = %body, "PostgREST request failed");

        if status == StatusCode::CONFLICT || error.code.as_deref() == Some(UNIQUE_VIOLATION) {
            return Err(StoreError::Conflict(
                error
                    .message
                    .unwrap_or_else(|| "Duplicate record".to_string()),
            ));
        }

        Err(StoreError::Remote {
            status: status.as_u16(),
            message: error.message.unwrap_or(body),
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table, params)?;
        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.json().await?)
    }

    async fn find_user(&self, column: &str, value: String) -> Result<Option<UserRow>, StoreError> {
        let rows: Vec<UserRow> = self
            .select(
                "users",
                &[("select", "*".to_string()), (column, format!("eq.{value}"))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn patch_user(&self, id: UserId, body: serde_json::Value) -> Result<(), StoreError> {
        let url = self.table_url("users", &[("id", format!("eq.{id}"))])?;
        self.send(
            self.request(Method::PATCH, url)
                .header("Prefer", "return=minimal")
                .json(&body),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for SupabaseClient {
    async fn create_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        #[derive(Deserialize)]
        struct Inserted {
            id: i32,
        }

        let url = self.table_url("users", &[("select", "id".to_string())])?;
        let body = json!([{
            "username": user.username,
            "email": user.email,
            "password": user.password_hash,
            "login_streak": 0,
        }]);

        let response = self
            .send(
                self.request(Method::POST, url)
                    .header("Prefer", "return=representation")
                    .json(&body),
            )
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    StoreError::Conflict("Username or email is already in use".to_string())
                }
                other => other,
            })?;

        let inserted: Vec<Inserted> = response.json().await?;
        inserted
            .first()
            .map(|row| UserId::new(row.id))
            .ok_or_else(|| StoreError::Internal("Insert returned no rows".to_string()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .find_user("username", username.to_string())
            .await?
            .map(|row| row.into_parts().0))
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self
            .find_user("id", id.to_string())
            .await?
            .map(|row| row.into_parts().0))
    }

    async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, StoreError> {
        let Some(row) = self.find_user("username", username.to_string()).await? else {
            return Ok(None);
        };

        match row.into_parts() {
            (user, Some(hash)) => Ok(Some((user, hash))),
            (user, None) => Err(StoreError::Decode(format!(
                "User {} has no password column",
                user.id
            ))),
        }
    }

    async fn update_login_streak(&self, id: UserId, streak: u32) -> Result<(), StoreError> {
        self.patch_user(
            id,
            json!({ "login_streak": streak, "last_login": Utc::now() }),
        )
        .await
    }

    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        self.patch_user(id, json!({ "password": password_hash })).await
    }

    async fn has_users(&self) -> Result<bool, StoreError> {
        let rows: Vec<serde_json::Value> = self
            .select(
                "users",
                &[("select", "id".to_string()), ("limit", "1".to_string())],
            )
            .await?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl AchievementStore for SupabaseClient {
    async fn sync_catalog(&self, catalog: &[AchievementDefinition]) -> Result<(), StoreError> {
        let url = self.table_url("achievements", &[("on_conflict", "id".to_string())])?;
        self.send(
            self.request(Method::POST, url)
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(catalog),
        )
        .await?;
        Ok(())
    }

    async fn list_catalog(&self) -> Result<Vec<AchievementDefinition>, StoreError> {
        self.select("achievements", &[("select", "*".to_string())])
            .await
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        achievement: AchievementKind,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        let rows: Vec<ProgressRow> = self
            .select(
                "user_achievements",
                &[
                    ("select", "*".to_string()),
                    ("user_id", format!("eq.{user_id}")),
                    ("achievement_id", format!("eq.{achievement}")),
                ],
            )
            .await?;

        rows.into_iter()
            .next()
            .map(ProgressRecord::try_from)
            .transpose()
    }

    async fn insert_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        let url = self.table_url("user_achievements", &[])?;
        self.send(
            self.request(Method::POST, url)
                .header("Prefer", "return=minimal")
                .json(&[ProgressRow::from(record)]),
        )
        .await?;
        Ok(())
    }

    async fn update_progress(&self, record: &ProgressRecord) -> Result<bool, StoreError> {
        let url = self.table_url(
            "user_achievements",
            &[
                ("user_id", format!("eq.{}", record.user_id)),
                ("achievement_id", format!("eq.{}", record.achievement)),
                ("completed", "eq.false".to_string()),
            ],
        )?;

        let response = self
            .send(
                self.request(Method::PATCH, url)
                    .header("Prefer", "return=representation")
                    .json(&json!({
                        "progress": record.progress,
                        "completed": record.completed,
                        "unlocked_at": record.unlocked_at,
                    })),
            )
            .await?;

        let updated: Vec<ProgressRow> = response.json().await?;
        Ok(!updated.is_empty())
    }

    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserAchievement>, StoreError> {
        let rows: Vec<ProgressRow> = self
            .select(
                "user_achievements",
                &[
                    ("select", "*".to_string()),
                    ("user_id", format!("eq.{user_id}")),
                ],
            )
            .await?;
        let catalog = self.list_catalog().await?;

        let mut joined = Vec::with_capacity(rows.len());
        for row in rows {
            let achievement_id = row.achievement_id.clone();
            match ProgressRecord::try_from(row) {
                Ok(record) => {
                    let definition = catalog.iter().find(|d| d.id == achievement_id);
                    joined.push(UserAchievement::from_record(record, definition));
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

#[async_trait]
impl Backend for SupabaseClient {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let url = self.table_url(
            "achievements",
            &[("select", "id".to_string()), ("limit", "1".to_string())],
        )?;
        self.send(self.request(Method::GET, url)).await?;
        Ok(())
    }
}
