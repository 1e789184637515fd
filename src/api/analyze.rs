use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::validation::validate_image;
use super::{AnalyzeRequest, ApiError, AppState};
use crate::services::analysis::AnalysisResult;

/// POST /analyze
/// Simulated analysis; the verdict is random
pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(payload) = payload?;
    let image = validate_image(payload.image.as_deref())?;
    let result = state.shared.analyzer.analyze(image);

    tracing::debug!(
        is_deepfake = result.is_deepfake,
        confidence = result.confidence,
        "Image analyzed"
    );

    Ok(Json(result))
}
