//! User profile repository.

use std::sync::Arc;

use crate::entities::{UserProfile, user_profile};
use photoboard_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// User profile repository for database operations.
#[derive(Clone)]
pub struct UserProfileRepository {
    db: Arc<DatabaseConnection>,
}

impl UserProfileRepository {
    /// Create a new user profile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a profile by owning user.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Option<user_profile::Model>> {
        UserProfile::find()
            .filter(user_profile::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a profile row.
    ///
    /// Returns `Ok(None)` when the unique index on `user_id` rejects the
    /// insert — the caller lost a concurrent get-or-create race and should
    /// re-read instead of failing.
    pub async fn insert(
        &self,
        model: user_profile::ActiveModel,
    ) -> AppResult<Option<user_profile::Model>> {
        match model.insert(self.db.as_ref()).await {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => match e.sql_err() {
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => Ok(None),
                _ => Err(AppError::Database(e.to_string())),
            },
        }
    }

    /// Update a profile.
    pub async fn update(
        &self,
        model: user_profile::ActiveModel,
    ) -> AppResult<user_profile::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_by_user() {
        let profile = user_profile::Model {
            id: "p1".to_string(),
            user_id: "u1".to_string(),
            bio: String::new(),
            avatar_key: None,
            avatar_url: None,
            created_at: Utc::now().into(),
            updated_at: None,
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[profile.clone()]])
                .into_connection(),
        );

        let repo = UserProfileRepository::new(db);
        let found = repo.find_by_user("u1").await.unwrap();

        assert!(found.is_some());
        assert_eq!(found.unwrap().bio, "");
    }
}
