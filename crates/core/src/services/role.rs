//! Role management service.
//!
//! Roles and permissions are data: this service creates them, wires them
//! together and seeds the builtin set at startup. Checks happen in the
//! authorization service, never here.

use chrono::Utc;
use photoboard_common::{AppError, AppResult, IdGenerator};
use photoboard_db::{
    entities::{permission, role},
    repositories::RoleRepository,
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::authorization::permissions;

/// Builtin roles and the permission codes they grant.
const BUILTIN_ROLES: &[(&str, &str, &[&str])] = &[
    (
        "moderators",
        "Moderate comments and profiles",
        &[
            permissions::CAN_MODERATE_COMMENTS,
            permissions::CAN_FEATURE_PHOTOS,
            permissions::CAN_VIEW_ALL_PROFILES,
        ],
    ),
    (
        "editors",
        "Publish and curate photos",
        &[
            permissions::CAN_PUBLISH_PHOTOS,
            permissions::CAN_FEATURE_PHOTOS,
        ],
    ),
    (
        "vip",
        "Trusted uploaders without quota",
        &[permissions::CAN_UPLOAD_UNLIMITED],
    ),
];

/// A role with its grants and member count, for admin listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleOverview {
    /// The role row.
    pub role: role::Model,
    /// Codes granted through this role.
    pub permission_codes: Vec<String>,
    /// Users holding this role.
    pub member_count: u64,
}

/// Role service for role and grant management.
#[derive(Clone)]
pub struct RoleService {
    role_repo: RoleRepository,
    id_gen: IdGenerator,
}

impl RoleService {
    /// Create a new role service.
    #[must_use]
    pub const fn new(role_repo: RoleRepository) -> Self {
        Self {
            role_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Seed the permission codes and builtin roles.
    ///
    /// Safe to run at every startup: everything here is get-or-create.
    pub async fn seed_defaults(&self) -> AppResult<()> {
        for (code, name) in permissions::ALL {
            self.ensure_permission(code, name).await?;
        }

        for (name, description, codes) in BUILTIN_ROLES {
            let role = self
                .role_repo
                .create_role(role::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    name: Set((*name).to_string()),
                    description: Set((*description).to_string()),
                    is_builtin: Set(true),
                    created_at: Set(Utc::now().into()),
                })
                .await?;

            for code in *codes {
                let permission = self
                    .role_repo
                    .find_permission_by_code(code)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Permission: {code}")))?;
                self.role_repo
                    .attach_permission(self.id_gen.generate(), &role.id, &permission.id)
                    .await?;
            }
        }

        tracing::info!("Seeded builtin roles and permissions");
        Ok(())
    }

    /// Create a role. Duplicate names fold into the existing role.
    pub async fn create_role(&self, name: &str, description: &str) -> AppResult<role::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Role name must not be empty".to_string()));
        }

        self.role_repo
            .create_role(role::ActiveModel {
                id: Set(self.id_gen.generate()),
                name: Set(name.to_string()),
                description: Set(description.to_string()),
                is_builtin: Set(false),
                created_at: Set(Utc::now().into()),
            })
            .await
    }

    /// Delete a role. Builtin roles refuse.
    pub async fn delete_role(&self, role_id: &str) -> AppResult<()> {
        let role = self.role_repo.get_role_by_id(role_id).await?;
        if role.is_builtin {
            return Err(AppError::Forbidden(
                "Builtin roles cannot be deleted".to_string(),
            ));
        }
        self.role_repo.delete_role(&role.id).await
    }

    /// All roles with their grants and member counts.
    pub async fn list_roles(&self) -> AppResult<Vec<RoleOverview>> {
        let roles = self.role_repo.list_roles().await?;

        let mut overviews = Vec::with_capacity(roles.len());
        for role in roles {
            let permission_codes = self
                .role_repo
                .permissions_of_role(&role.id)
                .await?
                .into_iter()
                .map(|p| p.code)
                .collect();
            let member_count = self.role_repo.count_members(&role.id).await?;
            overviews.push(RoleOverview {
                role,
                permission_codes,
                member_count,
            });
        }

        Ok(overviews)
    }

    /// Attach a permission code to a role, creating the code if needed.
    pub async fn attach_permission(&self, role_id: &str, code: &str) -> AppResult<()> {
        let role = self.role_repo.get_role_by_id(role_id).await?;
        let permission = self.ensure_permission(code, code).await?;
        self.role_repo
            .attach_permission(self.id_gen.generate(), &role.id, &permission.id)
            .await
    }

    /// Detach a permission code from a role.
    pub async fn detach_permission(&self, role_id: &str, code: &str) -> AppResult<()> {
        let permission = self
            .role_repo
            .find_permission_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Permission: {code}")))?;
        self.role_repo
            .detach_permission(role_id, &permission.id)
            .await
    }

    /// Put a user in a role. Idempotent.
    pub async fn assign(&self, role_id: &str, user_id: &str) -> AppResult<()> {
        let role = self.role_repo.get_role_by_id(role_id).await?;
        self.role_repo
            .add_member(self.id_gen.generate(), &role.id, user_id)
            .await
    }

    /// Remove a user from a role.
    pub async fn unassign(&self, role_id: &str, user_id: &str) -> AppResult<()> {
        self.role_repo.remove_member(role_id, user_id).await
    }

    /// Grant a permission code directly to a user.
    pub async fn grant(&self, user_id: &str, code: &str) -> AppResult<()> {
        let permission = self.ensure_permission(code, code).await?;
        self.role_repo
            .grant_user(self.id_gen.generate(), user_id, &permission.id)
            .await
    }

    /// Revoke a direct permission grant.
    pub async fn revoke(&self, user_id: &str, code: &str) -> AppResult<()> {
        let permission = self
            .role_repo
            .find_permission_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Permission: {code}")))?;
        self.role_repo.revoke_user(user_id, &permission.id).await
    }

    async fn ensure_permission(&self, code: &str, name: &str) -> AppResult<permission::Model> {
        if let Some(existing) = self.role_repo.find_permission_by_code(code).await? {
            return Ok(existing);
        }

        self.role_repo
            .create_permission(permission::ActiveModel {
                id: Set(self.id_gen.generate()),
                code: Set(code.to_string()),
                name: Set(name.to_string()),
                created_at: Set(Utc::now().into()),
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roles_cover_seeded_codes() {
        let all_codes: Vec<&str> = permissions::ALL.iter().map(|(code, _)| *code).collect();

        for (_, _, codes) in BUILTIN_ROLES {
            for code in *codes {
                assert!(all_codes.contains(code), "unseeded code: {code}");
            }
        }
    }

    #[test]
    fn test_moderators_can_moderate() {
        let (_, _, codes) = BUILTIN_ROLES
            .iter()
            .find(|(name, _, _)| *name == "moderators")
            .unwrap();
        assert!(codes.contains(&permissions::CAN_MODERATE_COMMENTS));
    }
}
