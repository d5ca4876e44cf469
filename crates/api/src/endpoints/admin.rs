//! Role administration endpoints.
//!
//! Everything here requires `can_manage_user_roles`. Handlers only ever
//! deal in permission codes; role names are data they pass through.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use photoboard_common::AppResult;
use photoboard_core::permissions;
use photoboard_core::role::RoleOverview;
use photoboard_db::entities::user;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

async fn require_role_admin(state: &AppState, user: &user::Model) -> AppResult<()> {
    state
        .authorization_service
        .require_permission(user, permissions::CAN_MANAGE_USER_ROLES)
        .await
}

/// List roles with grants and member counts.
async fn list_roles(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<RoleOverview>>> {
    require_role_admin(&state, &user).await?;
    let roles = state.role_service.list_roles().await?;
    Ok(ApiResponse::ok(roles))
}

/// Create-role request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Create a role.
async fn create_role(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateRoleRequest>,
) -> AppResult<ApiResponse<()>> {
    require_role_admin(&state, &user).await?;
    state
        .role_service
        .create_role(&req.name, &req.description)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Delete a role. Builtin roles refuse.
async fn delete_role(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(role_id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    require_role_admin(&state, &user).await?;
    state.role_service.delete_role(&role_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Permission attach/detach request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub code: String,
    /// True to attach/grant, false to detach/revoke.
    #[serde(default = "default_true")]
    pub grant: bool,
}

const fn default_true() -> bool {
    true
}

/// Attach or detach a permission code on a role.
async fn role_permission(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(role_id): Path<String>,
    Json(req): Json<PermissionRequest>,
) -> AppResult<ApiResponse<()>> {
    require_role_admin(&state, &user).await?;
    if req.grant {
        state
            .role_service
            .attach_permission(&role_id, &req.code)
            .await?;
    } else {
        state
            .role_service
            .detach_permission(&role_id, &req.code)
            .await?;
    }
    Ok(ApiResponse::ok(()))
}

/// Membership request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub user_id: String,
}

/// Add a user to a role.
async fn add_member(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(role_id): Path<String>,
    Json(req): Json<MemberRequest>,
) -> AppResult<ApiResponse<()>> {
    require_role_admin(&state, &user).await?;
    state.role_service.assign(&role_id, &req.user_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Remove a user from a role.
async fn remove_member(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((role_id, user_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<()>> {
    require_role_admin(&state, &user).await?;
    state.role_service.unassign(&role_id, &user_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Grant or revoke an individual permission on a user.
async fn user_permission(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<PermissionRequest>,
) -> AppResult<ApiResponse<()>> {
    require_role_admin(&state, &user).await?;
    if req.grant {
        state.role_service.grant(&user_id, &req.code).await?;
    } else {
        state.role_service.revoke(&user_id, &req.code).await?;
    }
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/{id}", delete(delete_role))
        .route("/roles/{id}/permissions", post(role_permission))
        .route("/roles/{id}/members", post(add_member))
        .route("/roles/{id}/members/{user_id}", delete(remove_member))
        .route("/users/{id}/permissions", post(user_permission))
}
