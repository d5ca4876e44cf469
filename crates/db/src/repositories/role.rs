//! Role and permission repository.
//!
//! Backs the authorization layer: roles, permission codes, role
//! memberships and individual grants. The effective-permission query is
//! re-run on every check so revocation takes effect on the next request.

use std::collections::HashSet;
use std::sync::Arc;

use crate::entities::{
    Permission, Role, RoleMember, RolePermission, UserPermission, permission, role, role_member,
    role_permission, user_permission,
};
use photoboard_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, SqlErr,
};

/// Role repository for database operations.
#[derive(Clone)]
pub struct RoleRepository {
    db: Arc<DatabaseConnection>,
}

impl RoleRepository {
    /// Create a new role repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // === Roles ===

    /// Find a role by ID.
    pub async fn find_role_by_id(&self, id: &str) -> AppResult<Option<role::Model>> {
        Role::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a role by ID, or fail with `NotFound`.
    pub async fn get_role_by_id(&self, id: &str) -> AppResult<role::Model> {
        self.find_role_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role: {id}")))
    }

    /// Find a role by name.
    pub async fn find_role_by_name(&self, name: &str) -> AppResult<Option<role::Model>> {
        Role::find()
            .filter(role::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a role.
    ///
    /// Returns the existing row when the name is already taken — role
    /// creation is get-or-create for idempotent seeding.
    pub async fn create_role(&self, model: role::ActiveModel) -> AppResult<role::Model> {
        let name = match &model.name {
            sea_orm::ActiveValue::Set(name) => name.clone(),
            _ => String::new(),
        };

        match model.insert(self.db.as_ref()).await {
            Ok(created) => Ok(created),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => self
                    .find_role_by_name(&name)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Role: {name}"))),
                _ => Err(AppError::Database(e.to_string())),
            },
        }
    }

    /// Delete a role (memberships and grants cascade).
    pub async fn delete_role(&self, id: &str) -> AppResult<()> {
        if let Some(role) = self.find_role_by_id(id).await? {
            role.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// All roles, by name.
    pub async fn list_roles(&self) -> AppResult<Vec<role::Model>> {
        Role::find()
            .order_by_asc(role::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count members of a role.
    pub async fn count_members(&self, role_id: &str) -> AppResult<u64> {
        RoleMember::find()
            .filter(role_member::Column::RoleId.eq(role_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // === Permissions ===

    /// Find a permission by code.
    pub async fn find_permission_by_code(
        &self,
        code: &str,
    ) -> AppResult<Option<permission::Model>> {
        Permission::find()
            .filter(permission::Column::Code.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a permission; folds a duplicate code into the existing row.
    pub async fn create_permission(
        &self,
        model: permission::ActiveModel,
    ) -> AppResult<permission::Model> {
        let code = match &model.code {
            sea_orm::ActiveValue::Set(code) => code.clone(),
            _ => String::new(),
        };

        match model.insert(self.db.as_ref()).await {
            Ok(created) => Ok(created),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => self
                    .find_permission_by_code(&code)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Permission: {code}"))),
                _ => Err(AppError::Database(e.to_string())),
            },
        }
    }

    /// Permissions attached to a role.
    pub async fn permissions_of_role(&self, role_id: &str) -> AppResult<Vec<permission::Model>> {
        Permission::find()
            .join(JoinType::InnerJoin, permission::Relation::RolePermissions.def())
            .filter(role_permission::Column::RoleId.eq(role_id))
            .order_by_asc(permission::Column::Code)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // === Grants and memberships (all idempotent) ===

    /// Attach a permission to a role.
    pub async fn attach_permission(
        &self,
        id: String,
        role_id: &str,
        permission_id: &str,
    ) -> AppResult<()> {
        let model = role_permission::ActiveModel {
            id: sea_orm::Set(id),
            role_id: sea_orm::Set(role_id.to_string()),
            permission_id: sea_orm::Set(permission_id.to_string()),
        };
        Self::insert_ignoring_duplicate(model.insert(self.db.as_ref()).await)
    }

    /// Detach a permission from a role.
    pub async fn detach_permission(&self, role_id: &str, permission_id: &str) -> AppResult<()> {
        RolePermission::delete_many()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .filter(role_permission::Column::PermissionId.eq(permission_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Add a user to a role.
    pub async fn add_member(&self, id: String, role_id: &str, user_id: &str) -> AppResult<()> {
        let model = role_member::ActiveModel {
            id: sea_orm::Set(id),
            role_id: sea_orm::Set(role_id.to_string()),
            user_id: sea_orm::Set(user_id.to_string()),
            created_at: sea_orm::Set(chrono::Utc::now().into()),
        };
        Self::insert_ignoring_duplicate(model.insert(self.db.as_ref()).await)
    }

    /// Remove a user from a role.
    pub async fn remove_member(&self, role_id: &str, user_id: &str) -> AppResult<()> {
        RoleMember::delete_many()
            .filter(role_member::Column::RoleId.eq(role_id))
            .filter(role_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Grant a permission directly to a user.
    pub async fn grant_user(
        &self,
        id: String,
        user_id: &str,
        permission_id: &str,
    ) -> AppResult<()> {
        let model = user_permission::ActiveModel {
            id: sea_orm::Set(id),
            user_id: sea_orm::Set(user_id.to_string()),
            permission_id: sea_orm::Set(permission_id.to_string()),
        };
        Self::insert_ignoring_duplicate(model.insert(self.db.as_ref()).await)
    }

    /// Revoke a direct permission grant from a user.
    pub async fn revoke_user(&self, user_id: &str, permission_id: &str) -> AppResult<()> {
        UserPermission::delete_many()
            .filter(user_permission::Column::UserId.eq(user_id))
            .filter(user_permission::Column::PermissionId.eq(permission_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // === Effective permissions ===

    /// Every permission code a user holds: individual grants unioned with
    /// the grants of every role the user belongs to.
    pub async fn permission_codes_for_user(&self, user_id: &str) -> AppResult<HashSet<String>> {
        let individual: Vec<String> = Permission::find()
            .select_only()
            .column(permission::Column::Code)
            .join(JoinType::InnerJoin, permission::Relation::UserPermissions.def())
            .filter(user_permission::Column::UserId.eq(user_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let member_of = Query::select()
            .column(role_member::Column::RoleId)
            .from(RoleMember)
            .and_where(Expr::col(role_member::Column::UserId).eq(user_id))
            .to_owned();

        let via_roles: Vec<String> = Permission::find()
            .select_only()
            .column(permission::Column::Code)
            .join(JoinType::InnerJoin, permission::Relation::RolePermissions.def())
            .filter(role_permission::Column::RoleId.in_subquery(member_of))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(individual.into_iter().chain(via_roles).collect())
    }

    fn insert_ignoring_duplicate<T>(result: Result<T, sea_orm::DbErr>) -> AppResult<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Ok(()),
                _ => Err(AppError::Database(e.to_string())),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_permission_codes_union() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // Individual grants
                .append_query_results([vec![maplit::btreemap! {
                    "code" => sea_orm::Value::from("can_feature_photos"),
                }]])
                // Via roles (overlaps with the individual grant)
                .append_query_results([vec![
                    maplit::btreemap! {
                        "code" => sea_orm::Value::from("can_feature_photos"),
                    },
                    maplit::btreemap! {
                        "code" => sea_orm::Value::from("can_moderate_comments"),
                    },
                ]])
                .into_connection(),
        );

        let repo = RoleRepository::new(db);
        let codes = repo.permission_codes_for_user("u1").await.unwrap();

        assert_eq!(codes.len(), 2);
        assert!(codes.contains("can_feature_photos"));
        assert!(codes.contains("can_moderate_comments"));
    }

    #[tokio::test]
    async fn test_find_role_by_name_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<role::Model>::new()])
                .into_connection(),
        );

        let repo = RoleRepository::new(db);
        let found = repo.find_role_by_name("missing").await.unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_role_model_shape() {
        let role = role::Model {
            id: "r1".to_string(),
            name: "moderators".to_string(),
            description: String::new(),
            is_builtin: true,
            created_at: Utc::now().into(),
        };
        assert!(role.is_builtin);
    }
}
