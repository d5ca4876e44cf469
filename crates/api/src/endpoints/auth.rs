//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{post, put},
};
use photoboard_common::AppResult;
use photoboard_core::user::{RegisterInput, UpdateUserInput};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Session response: the account and its API token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: String,
    pub username: String,
    pub token: String,
}

/// Register a new account.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let user = state.user_service.register(req).await?;
    let token = user.token.clone().unwrap_or_default();

    Ok(ApiResponse::ok(SessionResponse {
        user_id: user.id,
        username: user.username,
        token,
    }))
}

/// Login request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username or email address.
    pub identifier: String,
    pub password: String,
}

/// Log in with username or email.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let (user, token) = state
        .user_service
        .login(&req.identifier, &req.password)
        .await?;

    Ok(ApiResponse::ok(SessionResponse {
        user_id: user.id,
        username: user.username,
        token,
    }))
}

/// Forgot-password request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Start a password reset. Always succeeds; unknown addresses are not
/// revealed.
async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    state.user_service.request_password_reset(&req.email).await?;
    Ok(ApiResponse::ok(()))
}

/// Reset-password request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Complete a password reset with a mailed token.
async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .user_service
        .reset_password(&req.token, &req.password)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Update the caller's account fields.
async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateUserInput>,
) -> AppResult<ApiResponse<()>> {
    state.user_service.update(&user.id, req).await?;
    Ok(ApiResponse::ok(()))
}

/// Change-password request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Change the caller's password.
async fn change_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .user_service
        .change_password(&user.id, &req.current_password, &req.new_password)
        .await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/me", put(update_me))
        .route("/change-password", post(change_password))
}
