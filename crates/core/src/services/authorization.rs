//! Authorization service.
//!
//! The single place authorization decisions are made. Handlers consult
//! permission codes and ownership through this service and never inspect
//! role names themselves — roles are data, resolved here.

use photoboard_common::{AppError, AppResult};
use photoboard_db::{entities::user, repositories::RoleRepository};

/// Permission codes checked by handlers.
pub mod permissions {
    /// Publish photos without moderation.
    pub const CAN_PUBLISH_PHOTOS: &str = "can_publish_photos";
    /// Mark photos as featured.
    pub const CAN_FEATURE_PHOTOS: &str = "can_feature_photos";
    /// Edit or delete any comment.
    pub const CAN_MODERATE_COMMENTS: &str = "can_moderate_comments";
    /// View any user's profile.
    pub const CAN_VIEW_ALL_PROFILES: &str = "can_view_all_profiles";
    /// Edit any user's profile.
    pub const CAN_EDIT_ANY_PROFILE: &str = "can_edit_any_profile";
    /// Upload past the per-user photo quota.
    pub const CAN_UPLOAD_UNLIMITED: &str = "can_upload_unlimited";
    /// Manage roles and permission grants.
    pub const CAN_MANAGE_USER_ROLES: &str = "can_manage_user_roles";

    /// All codes, for seeding.
    pub const ALL: &[(&str, &str)] = &[
        (CAN_PUBLISH_PHOTOS, "Can publish photos without moderation"),
        (CAN_FEATURE_PHOTOS, "Can mark photos as featured"),
        (CAN_MODERATE_COMMENTS, "Can moderate comments"),
        (CAN_VIEW_ALL_PROFILES, "Can view all user profiles"),
        (CAN_EDIT_ANY_PROFILE, "Can edit any profile"),
        (CAN_UPLOAD_UNLIMITED, "Can upload an unlimited number of photos"),
        (CAN_MANAGE_USER_ROLES, "Can manage user roles"),
    ];
}

/// Authorization service for permission and ownership checks.
#[derive(Clone)]
pub struct AuthorizationService {
    role_repo: RoleRepository,
}

impl AuthorizationService {
    /// Create a new authorization service.
    #[must_use]
    pub const fn new(role_repo: RoleRepository) -> Self {
        Self { role_repo }
    }

    /// Whether the user holds a permission code.
    ///
    /// Superusers implicitly hold every permission. Otherwise the code
    /// must appear among the user's individual grants or the grants of a
    /// role the user belongs to. State is re-read on every call, so a
    /// revocation is effective on the next check.
    pub async fn has_permission(&self, user: &user::Model, code: &str) -> AppResult<bool> {
        if user.is_superuser {
            return Ok(true);
        }

        let codes = self.role_repo.permission_codes_for_user(&user.id).await?;
        Ok(codes.contains(code))
    }

    /// Require a permission code, or fail with `Forbidden`.
    pub async fn require_permission(&self, user: &user::Model, code: &str) -> AppResult<()> {
        if self.has_permission(user, code).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Missing permission: {code}"
            )))
        }
    }

    /// Require that the user owns the resource or is staff.
    ///
    /// `owner_id` is `None` for orphaned resources (uploader account
    /// deleted) — those are staff-only.
    pub fn require_owner_or_staff(
        user: &user::Model,
        owner_id: Option<&str>,
    ) -> AppResult<()> {
        if user.is_staff || user.is_superuser || owner_id == Some(user.id.as_str()) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the owner or staff may do this".to_string(),
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, is_staff: bool, is_superuser: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_string(),
            email: format!("{id}@example.com"),
            password_hash: "$argon2id$stub".to_string(),
            token: None,
            reset_token: None,
            reset_token_expires_at: None,
            is_staff,
            is_superuser,
            is_active: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service_with_codes(codes: Vec<&str>) -> AuthorizationService {
        let granted: Vec<std::collections::BTreeMap<&str, sea_orm::Value>> = codes
            .into_iter()
            .map(|c| maplit::btreemap! { "code" => sea_orm::Value::from(c) })
            .collect();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // Individual grants
                .append_query_results([granted])
                // Via roles
                .append_query_results([Vec::<
                    std::collections::BTreeMap<&str, sea_orm::Value>,
                >::new()])
                .into_connection(),
        );
        AuthorizationService::new(RoleRepository::new(db))
    }

    #[tokio::test]
    async fn test_superuser_holds_every_permission() {
        let root = create_test_user("root", false, true);
        // No query results appended: the check must not touch the database.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = AuthorizationService::new(RoleRepository::new(db));

        assert!(service
            .has_permission(&root, permissions::CAN_MANAGE_USER_ROLES)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_granted_code_passes() {
        let alice = create_test_user("alice", false, false);
        let service = service_with_codes(vec![permissions::CAN_FEATURE_PHOTOS]);

        assert!(service
            .has_permission(&alice, permissions::CAN_FEATURE_PHOTOS)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_missing_code_is_forbidden() {
        let alice = create_test_user("alice", false, false);
        let service = service_with_codes(vec![]);

        let result = service
            .require_permission(&alice, permissions::CAN_MODERATE_COMMENTS)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_owner_passes_ownership_check() {
        let alice = create_test_user("alice", false, false);
        assert!(AuthorizationService::require_owner_or_staff(&alice, Some("alice")).is_ok());
    }

    #[test]
    fn test_staff_passes_ownership_check() {
        let staff = create_test_user("mod", true, false);
        assert!(AuthorizationService::require_owner_or_staff(&staff, Some("alice")).is_ok());
    }

    #[test]
    fn test_stranger_fails_ownership_check() {
        let bob = create_test_user("bob", false, false);
        let result = AuthorizationService::require_owner_or_staff(&bob, Some("alice"));
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_orphaned_resource_is_staff_only() {
        let bob = create_test_user("bob", false, false);
        assert!(AuthorizationService::require_owner_or_staff(&bob, None).is_err());

        let staff = create_test_user("mod", true, false);
        assert!(AuthorizationService::require_owner_or_staff(&staff, None).is_ok());
    }
}
