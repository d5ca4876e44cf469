//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use photoboard_common::AppResult;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Comment representation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub photo_id: String,
    pub user_id: String,
    pub text: String,
    pub parent_id: Option<String>,
    pub created_at: String,
}

impl From<photoboard_db::entities::comment::Model> for CommentResponse {
    fn from(c: photoboard_db::entities::comment::Model) -> Self {
        Self {
            id: c.id,
            photo_id: c.photo_id,
            user_id: c.user_id,
            text: c.text,
            parent_id: c.parent_id,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// List comments on a photo, newest first.
async fn list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let comments = state.comment_service.list(&slug).await?;
    Ok(ApiResponse::ok(
        comments.into_iter().map(Into::into).collect(),
    ))
}

/// Create-comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub text: String,
    pub parent_id: Option<String>,
}

/// Add a comment to a photo.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state
        .comment_service
        .create(&user, &slug, &req.text, req.parent_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(comment.into()))
}

/// Edit-comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCommentRequest {
    pub text: String,
}

/// Edit a comment. Author or moderator.
async fn edit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EditCommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.comment_service.edit(&user, &id, &req.text).await?;
    Ok(ApiResponse::ok(comment.into()))
}

/// Delete a comment. Author or moderator.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.comment_service.delete(&user, &id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/photos/{slug}/comments", get(list).post(create))
        .route("/comments/{id}", put(edit).delete(delete))
}
