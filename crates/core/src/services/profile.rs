//! Profile service.
//!
//! Profiles are created through an explicit [`ProfileService::ensure_profile`]
//! call from the account flows — there is no hidden signal firing on save.

use std::sync::Arc;

use chrono::Utc;
use photoboard_common::{
    AppError, AppResult, IdGenerator, StorageBackend, generate_storage_key,
};
use photoboard_db::{
    entities::{user, user_profile},
    repositories::{UserProfileRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::authorization::{AuthorizationService, permissions};
use crate::services::photo::validate_image_upload;

/// Input for editing a profile.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    /// New bio text.
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

/// Profile service for lifecycle and access control.
#[derive(Clone)]
pub struct ProfileService {
    profile_repo: UserProfileRepository,
    user_repo: UserRepository,
    authz: AuthorizationService,
    storage: Arc<dyn StorageBackend>,
    max_avatar_size: u64,
    id_gen: IdGenerator,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub fn new(
        profile_repo: UserProfileRepository,
        user_repo: UserRepository,
        authz: AuthorizationService,
        storage: Arc<dyn StorageBackend>,
        max_avatar_size: u64,
    ) -> Self {
        Self {
            profile_repo,
            user_repo,
            authz,
            storage,
            max_avatar_size,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get the profile for a user, creating it if absent.
    ///
    /// Idempotent: a concurrent first call loses at the unique index on
    /// `user_id` and folds into a re-read.
    pub async fn ensure_profile(&self, user_id: &str) -> AppResult<user_profile::Model> {
        if let Some(existing) = self.profile_repo.find_by_user(user_id).await? {
            return Ok(existing);
        }

        let model = user_profile::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            bio: Set(String::new()),
            avatar_key: Set(None),
            avatar_url: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        match self.profile_repo.insert(model).await? {
            Some(created) => Ok(created),
            // Lost the creation race; the row exists now.
            None => self
                .profile_repo
                .find_by_user(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Profile for user: {user_id}"))),
        }
    }

    /// View a profile.
    ///
    /// A user can always view their own; anyone else needs
    /// `can_view_all_profiles`.
    pub async fn view(
        &self,
        requester: &user::Model,
        target_user_id: &str,
    ) -> AppResult<(user::Model, user_profile::Model)> {
        if requester.id != target_user_id {
            self.authz
                .require_permission(requester, permissions::CAN_VIEW_ALL_PROFILES)
                .await?;
        }

        let target = self.user_repo.get_by_id(target_user_id).await?;
        let profile = self.ensure_profile(target_user_id).await?;
        Ok((target, profile))
    }

    /// Edit a profile. Self or `can_edit_any_profile`.
    pub async fn update(
        &self,
        requester: &user::Model,
        target_user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user_profile::Model> {
        input.validate()?;
        self.require_edit(requester, target_user_id).await?;

        let profile = self.ensure_profile(target_user_id).await?;
        let mut model: user_profile::ActiveModel = profile.into();
        if let Some(bio) = input.bio {
            model.bio = Set(bio);
        }
        model.updated_at = Set(Some(Utc::now().into()));
        self.profile_repo.update(model).await
    }

    /// Replace the avatar image. Self or `can_edit_any_profile`.
    pub async fn update_avatar(
        &self,
        requester: &user::Model,
        target_user_id: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<user_profile::Model> {
        self.require_edit(requester, target_user_id).await?;
        validate_image_upload(content_type, data.len() as u64, self.max_avatar_size)?;

        let profile = self.ensure_profile(target_user_id).await?;
        let old_key = profile.avatar_key.clone();

        let extension = content_type.strip_prefix("image/").unwrap_or("bin");
        let key = generate_storage_key("avatars", &self.id_gen.generate(), extension);
        let uploaded = self.storage.upload(&key, data, content_type).await?;

        let mut model: user_profile::ActiveModel = profile.into();
        model.avatar_key = Set(Some(uploaded.key));
        model.avatar_url = Set(Some(uploaded.url));
        model.updated_at = Set(Some(Utc::now().into()));
        let updated = self.profile_repo.update(model).await?;

        // Best-effort cleanup of the replaced blob.
        if let Some(old_key) = old_key
            && let Err(e) = self.storage.delete(&old_key).await
        {
            tracing::warn!(error = %e, key = %old_key, "Failed to delete old avatar");
        }

        Ok(updated)
    }

    async fn require_edit(&self, requester: &user::Model, target_user_id: &str) -> AppResult<()> {
        if requester.id == target_user_id {
            return Ok(());
        }
        self.authz
            .require_permission(requester, permissions::CAN_EDIT_ANY_PROFILE)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use photoboard_common::LocalStorage;
    use photoboard_db::repositories::RoleRepository;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_profile(user_id: &str) -> user_profile::Model {
        user_profile::Model {
            id: format!("profile-{user_id}"),
            user_id: user_id.to_string(),
            bio: String::new(),
            avatar_key: None,
            avatar_url: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: Arc<sea_orm::DatabaseConnection>) -> ProfileService {
        ProfileService::new(
            UserProfileRepository::new(Arc::clone(&db)),
            UserRepository::new(Arc::clone(&db)),
            AuthorizationService::new(RoleRepository::new(Arc::clone(&db))),
            Arc::new(LocalStorage::new(
                std::env::temp_dir().join("photoboard-profile-test"),
                "/files".to_string(),
            )),
            5 * 1024 * 1024,
        )
    }

    #[tokio::test]
    async fn test_ensure_profile_returns_existing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_profile("u1")]])
                .into_connection(),
        );

        let result = service(db).ensure_profile("u1").await.unwrap();
        assert_eq!(result.user_id, "u1");
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_when_absent() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // No existing profile
                .append_query_results([Vec::<user_profile::Model>::new()])
                // Insert returns the created row
                .append_query_results([[create_test_profile("u1")]])
                .into_connection(),
        );

        let result = service(db).ensure_profile("u1").await.unwrap();
        assert_eq!(result.user_id, "u1");
        assert_eq!(result.bio, "");
    }

    #[test]
    fn test_bio_length_cap() {
        let input = UpdateProfileInput {
            bio: Some("x".repeat(501)),
        };
        assert!(input.validate().is_err());
    }
}
