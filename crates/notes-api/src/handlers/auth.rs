//! Authentication API handlers

use crate::audit::ClientInfo;
use crate::auth::{AuthenticatedUser, Credentials, RefreshRequest};
use crate::error::{ApiJson, AppError};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Plain confirmation message
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Tokens returned by a successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Access token for the `Authorization: Bearer` header
    pub token: String,
    /// Refresh token for `/refresh`
    pub refresh_token: String,
}

/// A freshly issued access token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Register a new user account
///
/// The email is trimmed and lowercased. Passwords must be 6 characters to
/// 72 bytes long.
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "User registered successfully", body = MessageResponse),
        (status = 400, description = "Invalid input or email already registered", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<Credentials>,
) -> Result<Json<MessageResponse>, AppError> {
    let client = ClientInfo::from_headers(&headers);
    state
        .auth
        .register(&request.email, &request.password, &client)
        .await?;

    Ok(Json(MessageResponse::new("User registered successfully")))
}

/// Login with email and password
///
/// Replaces any refresh token issued by an earlier login.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed request body", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<Credentials>,
) -> Result<Json<LoginResponse>, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let pair = state
        .auth
        .login(&request.email, &request.password, &client)
        .await?;

    Ok(Json(LoginResponse {
        token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 400, description = "Invalid, expired or revoked refresh token", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let access_token = state.auth.refresh(&request.refresh_token, &client).await?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Logout: revoke the caller's refresh token
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>, AppError> {
    let client = ClientInfo::from_headers(&headers);
    state.auth.logout(user.user_id, &client).await?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}
