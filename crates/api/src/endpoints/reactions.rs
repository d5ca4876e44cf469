//! Reaction endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};
use photoboard_common::AppResult;
use photoboard_db::entities::reaction::ReactionKind;
use photoboard_db::repositories::ReactionChange;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Set-reaction request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReactionRequest {
    pub kind: ReactionKind,
}

/// Reaction outcome with fresh aggregates.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResponse {
    /// What the vote did: "added", "removed" or "flipped".
    pub change: &'static str,
    pub likes: u64,
    pub dislikes: u64,
}

/// Set the caller's reaction on a photo.
///
/// Re-submitting the same kind retracts the vote; the opposite kind
/// flips it.
async fn set(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<SetReactionRequest>,
) -> AppResult<ApiResponse<ReactionResponse>> {
    let (change, counts) = state
        .reaction_service
        .set(&user.id, &slug, req.kind)
        .await?;

    let change = match change {
        ReactionChange::Added => "added",
        ReactionChange::Removed => "removed",
        ReactionChange::Flipped => "flipped",
    };

    Ok(ApiResponse::ok(ReactionResponse {
        change,
        likes: counts.likes,
        dislikes: counts.dislikes,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/photos/{slug}/reaction", put(set))
}
