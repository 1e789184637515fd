use axum::http::HeaderMap;

use super::ApiError;
use crate::domain::UserId;

pub fn validate_user_id(raw: &str) -> Result<UserId, ApiError> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(UserId::new(id)),
        _ => Err(ApiError::validation(format!(
            "Invalid user ID: {raw}. ID must be a positive integer"
        ))),
    }
}

pub fn validate_image(image: Option<&str>) -> Result<&str, ApiError> {
    match image.map(str::trim) {
        Some(image) if !image.is_empty() => Ok(image),
        _ => Err(ApiError::validation("No image was provided")),
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
