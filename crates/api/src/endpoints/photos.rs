//! Photo endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    routing::{get, post},
};
use photoboard_common::{AppError, AppResult};
use photoboard_core::browse::{DEFAULT_PER_PAGE, PhotoStats, SortKey};
use photoboard_core::photo::{CreatePhotoInput, UpdatePhotoInput};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Photo summary in listings.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub image_url: String,
    pub description: String,
    pub category: String,
    pub uploader_id: Option<String>,
    pub is_featured: bool,
    pub views_count: i32,
    pub created_at: String,
}

impl From<photoboard_db::entities::photo::Model> for PhotoResponse {
    fn from(p: photoboard_db::entities::photo::Model) -> Self {
        Self {
            id: p.id,
            title: p.title,
            slug: p.slug,
            image_url: p.image_url,
            description: p.description,
            category: p.category.code().to_string(),
            uploader_id: p.uploader_id,
            is_featured: p.is_featured,
            views_count: p.views_count,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// One page of photos.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPageResponse {
    pub items: Vec<PhotoResponse>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPhotosQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub year: Option<i32>,
    pub sort: Option<String>,
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

/// List photos with filters, sorting and pagination.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListPhotosQuery>,
) -> AppResult<ApiResponse<PhotoPageResponse>> {
    let sort = SortKey::parse(query.sort.as_deref())?;

    let page = state
        .browse_service
        .list(
            query.category.as_deref(),
            query.tag.as_deref(),
            query.year,
            sort,
            query.page,
            query.per_page,
        )
        .await?;

    Ok(ApiResponse::ok(PhotoPageResponse {
        items: page.items.into_iter().map(Into::into).collect(),
        page: page.page,
        per_page: page.per_page,
        total_items: page.total_items,
        total_pages: page.total_pages,
    }))
}

/// Upload a photo via multipart form.
async fn upload(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<PhotoResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut content_type: Option<String> = None;
    let mut title = String::new();
    let mut description = String::new();
    let mut category = "other".to_string();
    let mut tags = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" => {
                content_type = field.content_type().map(std::string::ToString::to_string);
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?
                        .to_vec(),
                );
            }
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            "description" => {
                description = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            "category" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !text.is_empty() {
                    category = text;
                }
            }
            "tags" => {
                tags = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            _ => {}
        }
    }

    let data = file_data
        .ok_or_else(|| AppError::Validation("Missing image field".to_string()))?;
    let content_type =
        content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    let input = CreatePhotoInput {
        title,
        description,
        category,
        tags,
    };

    let photo = state
        .photo_service
        .create(&user, input, &data, &content_type)
        .await?;

    Ok(ApiResponse::ok(photo.into()))
}

/// Photo detail: the photo plus its neighbours, related photos, tags and
/// engagement counts.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDetailResponse {
    #[serde(flatten)]
    pub photo: PhotoResponse,
    pub uploader_username: Option<String>,
    pub tags: Vec<String>,
    pub likes: u64,
    pub dislikes: u64,
    pub comments_count: u64,
    pub viewer_reaction: Option<String>,
    pub previous_slug: Option<String>,
    pub next_slug: Option<String>,
    pub category_previous_slug: Option<String>,
    pub category_next_slug: Option<String>,
    pub related: Vec<PhotoResponse>,
}

/// Get a photo by slug. Counts the view.
async fn detail(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<PhotoDetailResponse>> {
    let photo = state.photo_service.view(&slug).await?;

    let uploader_username = match photo.uploader_id {
        Some(ref uploader_id) => state
            .user_service
            .get(uploader_id)
            .await
            .ok()
            .map(|u| u.username),
        None => None,
    };

    let tags = state
        .tag_service
        .tags_of_photo(&photo.id)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();

    let counts = state.reaction_service.counts(&photo.id).await?;
    let comments_count = state.comment_service.list(&slug).await?.len() as u64;

    let viewer_reaction = match viewer {
        Some(ref viewer) => state
            .reaction_service
            .find(&viewer.id, &photo.id)
            .await?
            .map(|r| match r.kind {
                photoboard_db::entities::reaction::ReactionKind::Like => "like".to_string(),
                photoboard_db::entities::reaction::ReactionKind::Dislike => "dislike".to_string(),
            }),
        None => None,
    };

    let (previous, next) = state.browse_service.adjacent(&photo).await?;
    let (category_previous, category_next) =
        state.browse_service.adjacent_in_category(&photo).await?;
    let related = state.browse_service.related(&photo).await?;

    Ok(ApiResponse::ok(PhotoDetailResponse {
        photo: photo.into(),
        uploader_username,
        tags,
        likes: counts.likes,
        dislikes: counts.dislikes,
        comments_count,
        viewer_reaction,
        previous_slug: previous.map(|p| p.slug),
        next_slug: next.map(|p| p.slug),
        category_previous_slug: category_previous.map(|p| p.slug),
        category_next_slug: category_next.map(|p| p.slug),
        related: related.into_iter().map(Into::into).collect(),
    }))
}

/// Edit a photo's metadata. Uploader or staff.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<UpdatePhotoInput>,
) -> AppResult<ApiResponse<PhotoResponse>> {
    let photo = state.photo_service.update(&user, &slug, req).await?;
    Ok(ApiResponse::ok(photo.into()))
}

/// Delete a photo. Uploader or staff.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.photo_service.delete(&user, &slug).await?;
    Ok(ApiResponse::ok(()))
}

/// Feature request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRequest {
    pub featured: bool,
}

/// Mark or unmark a photo as featured.
async fn feature(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<FeatureRequest>,
) -> AppResult<ApiResponse<PhotoResponse>> {
    let photo = state
        .photo_service
        .feature(&user, &slug, req.featured)
        .await?;
    Ok(ApiResponse::ok(photo.into()))
}

/// Aggregate statistics over the photo store.
async fn stats(State(state): State<AppState>) -> AppResult<ApiResponse<PhotoStats>> {
    let stats = state.browse_service.stats().await?;
    Ok(ApiResponse::ok(stats))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(upload))
        .route("/stats", get(stats))
        .route("/{slug}", get(detail).put(update).delete(delete))
        .route("/{slug}/feature", post(feature))
}
