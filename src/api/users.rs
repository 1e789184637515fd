use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::validation::validate_user_id;
use super::{ApiError, AppState, UserDto};
use crate::models::UserAchievement;
use crate::services::AuthUser;

/// GET /user
/// Profile of the authenticated user, achievements included
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserDto>, ApiError> {
    let profile = state.auth_service().current_user(user.id).await?;
    Ok(Json(profile.into()))
}

/// GET /user/{user_id}/achievements
pub async fn get_user_achievements(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UserAchievement>>, ApiError> {
    let user_id = validate_user_id(&user_id)?;
    let rows = state
        .achievement_service()
        .user_achievements(user_id)
        .await?;
    Ok(Json(rows))
}
