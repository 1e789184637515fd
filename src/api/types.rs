use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::UserId;
use crate::models::UserAchievement;
use crate::services::UserProfile;

/// Envelope used for error bodies and simple acknowledgements.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// Absent and null fields both arrive as `None`; the handlers pass them on
// as empty strings so the service answers with a 400.

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub login_streak: u32,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub achievements: Vec<UserAchievement>,
}

impl From<UserProfile> for UserDto {
    fn from(profile: UserProfile) -> Self {
        let UserProfile { user, achievements } = profile;
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            login_streak: user.login_streak,
            last_login: user.last_login,
            created_at: user.created_at,
            achievements,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserDto,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct DetectionResponse {
    pub success: bool,
    pub progress: i32,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiagnoseResponse {
    pub success: bool,
    pub backend: &'static str,
    pub connection: ConnectionStatus,
    pub env: DiagnoseEnv,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Effective secrets, masked.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnoseEnv {
    pub supabase_url: String,
    pub supabase_key: String,
    pub jwt_secret: String,
}
