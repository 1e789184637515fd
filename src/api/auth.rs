use axum::{
    Extension, Json,
    extract::{ConnectInfo, FromRequestParts, Request, State, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

use super::validation::bearer_token;
use super::{
    ApiError, ApiResponse, AppState, AuthResponse, ChangePasswordRequest, LoginRequest,
    RegisterRequest, UserDto,
};
use crate::services::{AuthError, AuthUser, Session};

// ============================================================================
// Client address
// ============================================================================

/// Peer address of the connection, `unknown` when the server was not started
/// with connect info (e.g. in tests).
#[derive(Debug, Clone)]
pub struct ClientAddr(pub String);

impl fmt::Display for ClientAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.to_string());
        Ok(Self(addr))
    }
}

/// Logs Input Guard hits with the client address before mapping the error.
fn reject(err: AuthError, client: &ClientAddr, action: &'static str) -> ApiError {
    if let AuthError::SuspectedInjection { field } = &err {
        warn!(client = %client, field, action, "Suspicious input rejected");
        metrics::counter!("input_guard_rejections_total", "field" => *field).increment(1);
    }
    err.into()
}

fn auth_response(message: &str, session: Session) -> AuthResponse {
    AuthResponse {
        message: message.to_string(),
        user: UserDto::from(session.profile),
        token: session.token,
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Requires `Authorization: Bearer <token>` and makes the verified
/// [`AuthUser`] available to handlers as an extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(request.headers()) else {
        return Err(ApiError::unauthorized("Authentication token required"));
    };

    let user = state.auth_service().verify_token(token)?;

    tracing::Span::current().record("user_id", user.id.value());
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    client: ClientAddr,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(payload) = payload?;
    let session = state
        .auth_service()
        .register(crate::services::RegisterRequest {
            username: payload.username.unwrap_or_default(),
            email: payload.email.unwrap_or_default(),
            password: payload.password.unwrap_or_default(),
        })
        .await
        .map_err(|e| reject(e, &client, "register"))?;

    Ok((
        StatusCode::CREATED,
        Json(auth_response("User registered successfully", session)),
    ))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientAddr,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload?;
    let session = state
        .auth_service()
        .login(
            payload.username.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|e| reject(e, &client, "login"))?;

    Ok(Json(auth_response("Login successful", session)))
}

/// PUT /user/password
/// Change password (requires current password verification)
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(payload) = payload?;
    state
        .auth_service()
        .change_password(
            user.id,
            payload.current_password.as_deref().unwrap_or_default(),
            payload.new_password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(ApiResponse::success(
        "Password updated successfully".to_string(),
    )))
}
