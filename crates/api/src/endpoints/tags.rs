//! Tag endpoints.

use axum::{Router, extract::State, routing::get};
use photoboard_common::AppResult;
use photoboard_core::tag::TagStats;
use serde::Serialize;

use crate::{middleware::AppState, response::ApiResponse};

/// A tag with its usage count.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub name: String,
    pub slug: String,
    pub usage: u64,
}

/// Tag listing plus aggregate usage statistics.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagListResponse {
    pub tags: Vec<TagResponse>,
    pub stats: TagStats,
}

/// List all tags with usage counts and aggregate statistics.
async fn list(State(state): State<AppState>) -> AppResult<ApiResponse<TagListResponse>> {
    let counted = state.tag_service.list_with_counts().await?;
    let stats = state.tag_service.stats().await?;

    let tags = counted
        .into_iter()
        .map(|(tag, usage)| TagResponse {
            name: tag.name,
            slug: tag.slug,
            usage,
        })
        .collect();

    Ok(ApiResponse::ok(TagListResponse { tags, stats }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_list_serializes_camel_case() {
        let response = TagListResponse {
            tags: vec![TagResponse {
                name: "mountains".to_string(),
                slug: "mountains".to_string(),
                usage: 3,
            }],
            stats: TagStats {
                total_tags: 1,
                max_usage: 3,
                avg_usage: 3.0,
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["stats"]["totalTags"], 1);
        assert_eq!(json["tags"][0]["usage"], 3);
    }
}
