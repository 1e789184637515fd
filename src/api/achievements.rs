use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use super::{ApiError, AppState, DetectionResponse};
use crate::models::AchievementDefinition;
use crate::services::AuthUser;

/// GET /achievements
pub async fn list_achievements(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AchievementDefinition>>, ApiError> {
    let catalog = state.achievement_service().catalog().await?;
    Ok(Json(catalog))
}

/// POST /detection/record
/// Counts a high-confidence detection towards `detection-master`
pub async fn record_detection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let record = state
        .achievement_service()
        .record_detection(user.id)
        .await?;

    Ok(Json(DetectionResponse {
        success: true,
        progress: record.progress,
        completed: record.completed,
    }))
}
