//! System endpoints: liveness and a connectivity diagnosis.

use axum::{Json, extract::State};
use std::sync::Arc;

use crate::db::Backend;

use super::{AppState, ConnectionStatus, DiagnoseEnv, DiagnoseResponse, HealthResponse};

/// Shows just enough of a secret to tell which one is configured.
#[must_use]
pub fn mask_value(value: Option<&str>) -> String {
    match value {
        None | Some("") => "no-value".to_string(),
        Some(v) if v.chars().count() <= 8 => "***masked***".to_string(),
        Some(v) => {
            let chars: Vec<char> = v.chars().collect();
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{head}...{tail}")
        }
    }
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /diagnose
pub async fn diagnose(State(state): State<Arc<AppState>>) -> Json<DiagnoseResponse> {
    let store = &state.shared.store;
    let connection = match store.ping().await {
        Ok(()) => ConnectionStatus { ok: true, error: None },
        Err(e) => {
            tracing::warn!(backend = store.name(), error = %e, "Diagnosis: store unreachable");
            ConnectionStatus {
                ok: false,
                error: Some(e.to_string()),
            }
        }
    };

    let config = &state.shared.config;
    Json(DiagnoseResponse {
        success: true,
        backend: store.name(),
        connection,
        env: DiagnoseEnv {
            supabase_url: mask_value(config.storage.supabase_url.as_deref()),
            supabase_key: mask_value(config.storage.supabase_key.as_deref()),
            jwt_secret: mask_value(config.auth.jwt_secret.as_deref()),
        },
    })
}
