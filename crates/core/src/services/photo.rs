//! Photo service.
//!
//! Upload, edit, delete and the slug assignment contract.

use std::sync::Arc;

use chrono::Utc;
use photoboard_common::{
    AppError, AppResult, IdGenerator, StorageBackend, generate_storage_key, slug,
};
use photoboard_db::{
    entities::{photo, photo::PhotoCategory, user},
    repositories::PhotoRepository,
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::authorization::{AuthorizationService, permissions};
use crate::services::tag::TagService;

/// Reject a non-image or oversized upload before touching storage.
pub(crate) fn validate_image_upload(
    content_type: &str,
    size: u64,
    max_size: u64,
) -> AppResult<()> {
    if !content_type.starts_with("image/") {
        return Err(AppError::Validation(format!(
            "Expected an image upload, got '{content_type}'"
        )));
    }
    if size == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if size > max_size {
        return Err(AppError::Validation(format!(
            "File too large: {size} bytes (maximum {max_size})"
        )));
    }
    Ok(())
}

/// Input for uploading a photo.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePhotoInput {
    /// Photo title.
    #[validate(length(max = 200))]
    pub title: String,
    /// Description text.
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
    /// Category code.
    pub category: String,
    /// Comma-separated tags.
    #[serde(default)]
    pub tags: String,
}

/// Input for editing a photo. Slug and upload time are immutable.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhotoInput {
    /// New title.
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    /// New description.
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// New category code.
    pub category: Option<String>,
    /// Replacement comma-separated tag list.
    pub tags: Option<String>,
}

/// Photo service for content mutations.
#[derive(Clone)]
pub struct PhotoService {
    photo_repo: PhotoRepository,
    tag_service: TagService,
    authz: AuthorizationService,
    storage: Arc<dyn StorageBackend>,
    max_photo_size: u64,
    upload_quota: u64,
    id_gen: IdGenerator,
}

impl PhotoService {
    /// Create a new photo service.
    #[must_use]
    pub fn new(
        photo_repo: PhotoRepository,
        tag_service: TagService,
        authz: AuthorizationService,
        storage: Arc<dyn StorageBackend>,
        max_photo_size: u64,
        upload_quota: u64,
    ) -> Self {
        Self {
            photo_repo,
            tag_service,
            authz,
            storage,
            max_photo_size,
            upload_quota,
            id_gen: IdGenerator::new(),
        }
    }

    /// Upload a photo.
    ///
    /// The blob is stored first; if the metadata insert then fails the
    /// blob is deleted best-effort so storage does not leak.
    pub async fn create(
        &self,
        uploader: &user::Model,
        input: CreatePhotoInput,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<photo::Model> {
        input.validate()?;

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }

        let category = PhotoCategory::parse(&input.category)
            .ok_or_else(|| AppError::Validation(format!("Unknown category: {}", input.category)))?;

        validate_image_upload(content_type, data.len() as u64, self.max_photo_size)?;

        // Quota, bypassed by can_upload_unlimited
        if !self
            .authz
            .has_permission(uploader, permissions::CAN_UPLOAD_UNLIMITED)
            .await?
        {
            let uploaded = self.photo_repo.count_by_uploader(&uploader.id).await?;
            if uploaded >= self.upload_quota {
                return Err(AppError::Forbidden(format!(
                    "Upload quota of {} photos reached",
                    self.upload_quota
                )));
            }
        }

        let id = self.id_gen.generate();
        let mut base = slug::slugify(&title);
        if base.is_empty() {
            base = slug::fallback_slug("photo", &id);
        }

        let extension = content_type.strip_prefix("image/").unwrap_or("bin");
        let key = generate_storage_key("photos", &id, extension);
        let uploaded = self.storage.upload(&key, data, content_type).await?;

        let model = photo::ActiveModel {
            id: Set(id.clone()),
            title: Set(title),
            // Assigned by the retry loop
            slug: Set(String::new()),
            image_key: Set(uploaded.key.clone()),
            image_url: Set(uploaded.url),
            description: Set(input.description),
            category: Set(category),
            uploader_id: Set(Some(uploader.id.clone())),
            is_featured: Set(false),
            views_count: Set(0),
            created_at: Set(Utc::now().into()),
        };

        let created = match self.photo_repo.insert_with_slug(model, &base).await {
            Ok(created) => created,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&uploaded.key).await {
                    tracing::warn!(error = %cleanup, key = %uploaded.key, "Failed to clean up blob after insert failure");
                }
                return Err(e);
            }
        };

        if !input.tags.trim().is_empty() {
            self.tag_service.set_tags(&created.id, &input.tags).await?;
        }

        tracing::info!(photo_id = %created.id, slug = %created.slug, "Uploaded photo");
        Ok(created)
    }

    /// Edit a photo's metadata. Uploader or staff only.
    pub async fn update(
        &self,
        requester: &user::Model,
        slug: &str,
        input: UpdatePhotoInput,
    ) -> AppResult<photo::Model> {
        input.validate()?;

        let photo = self.photo_repo.get_by_slug(slug).await?;
        AuthorizationService::require_owner_or_staff(requester, photo.uploader_id.as_deref())?;

        let category = match input.category {
            Some(ref code) => Some(
                PhotoCategory::parse(code)
                    .ok_or_else(|| AppError::Validation(format!("Unknown category: {code}")))?,
            ),
            None => None,
        };

        let photo_id = photo.id.clone();
        let mut model: photo::ActiveModel = photo.into();
        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::Validation("Title must not be empty".to_string()));
            }
            model.title = Set(title);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(category) = category {
            model.category = Set(category);
        }

        let updated = self.photo_repo.update(model).await?;

        if let Some(ref tags) = input.tags {
            self.tag_service.set_tags(&photo_id, tags).await?;
        }

        Ok(updated)
    }

    /// Delete a photo. Uploader or staff only.
    ///
    /// The metadata row goes first; a failure releasing the image blob is
    /// logged and does not undo the delete.
    pub async fn delete(&self, requester: &user::Model, slug: &str) -> AppResult<()> {
        let photo = self.photo_repo.get_by_slug(slug).await?;
        AuthorizationService::require_owner_or_staff(requester, photo.uploader_id.as_deref())?;

        self.photo_repo.delete(&photo.id).await?;

        if let Err(e) = self.storage.delete(&photo.image_key).await {
            tracing::warn!(error = %e, key = %photo.image_key, "Failed to release image blob");
        }

        tracing::info!(photo_id = %photo.id, slug = %photo.slug, "Deleted photo");
        Ok(())
    }

    /// Mark or unmark a photo as featured. Requires `can_feature_photos`.
    pub async fn feature(
        &self,
        requester: &user::Model,
        slug: &str,
        featured: bool,
    ) -> AppResult<photo::Model> {
        self.authz
            .require_permission(requester, permissions::CAN_FEATURE_PHOTOS)
            .await?;

        let photo = self.photo_repo.get_by_slug(slug).await?;
        let mut model: photo::ActiveModel = photo.into();
        model.is_featured = Set(featured);
        self.photo_repo.update(model).await
    }

    /// Get a photo by slug.
    pub async fn get_by_slug(&self, slug: &str) -> AppResult<photo::Model> {
        self.photo_repo.get_by_slug(slug).await
    }

    /// Get a photo by slug and count the view.
    ///
    /// The increment is a single atomic UPDATE; the returned model
    /// reflects the new count.
    pub async fn view(&self, slug: &str) -> AppResult<photo::Model> {
        let mut photo = self.photo_repo.get_by_slug(slug).await?;
        self.photo_repo.increment_views(&photo.id).await?;
        photo.views_count += 1;
        Ok(photo)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_image_upload() {
        assert!(validate_image_upload("image/jpeg", 1024, 10_000).is_ok());
        assert!(validate_image_upload("image/png", 10_000, 10_000).is_ok());

        let wrong_type = validate_image_upload("text/html", 1024, 10_000);
        assert!(matches!(wrong_type, Err(AppError::Validation(_))));

        let too_big = validate_image_upload("image/jpeg", 10_001, 10_000);
        assert!(matches!(too_big, Err(AppError::Validation(_))));

        let empty = validate_image_upload("image/jpeg", 0, 10_000);
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_input_length_caps() {
        let input = CreatePhotoInput {
            title: "x".repeat(201),
            description: String::new(),
            category: "nature".to_string(),
            tags: String::new(),
        };
        assert!(input.validate().is_err());
    }
}
