//! Profile endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    routing::{get, put},
};
use photoboard_common::{AppError, AppResult};
use photoboard_core::browse::DEFAULT_PER_PAGE;
use photoboard_core::profile::UpdateProfileInput;
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::photos::{PhotoPageResponse, PhotoResponse},
    extractors::AuthUser,
    middleware::AppState,
    response::ApiResponse,
};

/// Profile representation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: String,
    pub username: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub is_staff: bool,
    pub created_at: String,
}

/// View a user's profile. Self always; others need
/// `can_view_all_profiles`.
async fn view(
    AuthUser(requester): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let target = state.user_service.get_by_username(&username).await?;
    let (user, profile) = state.profile_service.view(&requester, &target.id).await?;

    Ok(ApiResponse::ok(ProfileResponse {
        user_id: user.id,
        username: user.username,
        bio: profile.bio,
        avatar_url: profile.avatar_url,
        is_staff: user.is_staff,
        created_at: profile.created_at.to_rfc3339(),
    }))
}

/// Update the caller's own profile.
async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<()>> {
    state.profile_service.update(&user, &user.id, req).await?;
    Ok(ApiResponse::ok(()))
}

/// Replace the caller's avatar via multipart form.
async fn update_avatar(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<()>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("avatar") {
            content_type = field.content_type().map(std::string::ToString::to_string);
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec(),
            );
        }
    }

    let data = file_data
        .ok_or_else(|| AppError::Validation("Missing avatar field".to_string()))?;
    let content_type =
        content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    state
        .profile_service
        .update_avatar(&user, &user.id, &data, &content_type)
        .await?;

    Ok(ApiResponse::ok(()))
}

/// Pagination query for a user's uploads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPhotosQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

const fn default_page() -> u64 {
    1
}

const fn default_per_page() -> u64 {
    DEFAULT_PER_PAGE
}

/// A user's uploads, newest first. Public.
async fn user_photos(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<UserPhotosQuery>,
) -> AppResult<ApiResponse<PhotoPageResponse>> {
    let user = state.user_service.get_by_username(&username).await?;

    let page = state
        .browse_service
        .list_by_user(&user.id, query.page, query.per_page)
        .await?;

    Ok(ApiResponse::ok(PhotoPageResponse {
        items: page.items.into_iter().map(PhotoResponse::from).collect(),
        page: page.page,
        per_page: page.per_page,
        total_items: page.total_items,
        total_pages: page.total_pages,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{username}/profile", get(view))
        .route("/users/{username}/photos", get(user_photos))
        .route("/profiles/me", put(update_me))
        .route("/profiles/me/avatar", put(update_avatar))
}
