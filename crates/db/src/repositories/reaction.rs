//! Reaction repository.

use std::sync::Arc;

use crate::entities::{Reaction, reaction, reaction::ReactionKind};
use chrono::Utc;
use photoboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};

/// What a toggle write actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    /// No prior reaction; one was created.
    Added,
    /// Same kind re-submitted; the reaction was retracted.
    Removed,
    /// Opposite kind submitted; the reaction was flipped in place.
    Flipped,
}

/// Aggregate like/dislike counts for a photo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactionCounts {
    /// Live likes.
    pub likes: u64,
    /// Live dislikes.
    pub dislikes: u64,
}

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a reaction by user and photo. Explicit lookup, never an
    /// exists-or-raises probe.
    pub async fn find_by_user_and_photo(
        &self,
        user_id: &str,
        photo_id: &str,
    ) -> AppResult<Option<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::PhotoId.eq(photo_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Toggle a user's reaction on a photo inside a transaction.
    ///
    /// No row → insert; same kind → delete; opposite kind → update in
    /// place. The unique `(user_id, photo_id)` index backstops concurrent
    /// double-submission: losing the insert race surfaces as `Conflict`
    /// rather than a duplicate vote.
    pub async fn toggle(
        &self,
        id: String,
        user_id: &str,
        photo_id: &str,
        kind: ReactionKind,
    ) -> AppResult<ReactionChange> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let existing = Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::PhotoId.eq(photo_id))
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let change = match existing {
            None => {
                let model = reaction::ActiveModel {
                    id: Set(id),
                    user_id: Set(user_id.to_string()),
                    photo_id: Set(photo_id.to_string()),
                    kind: Set(kind),
                    created_at: Set(Utc::now().into()),
                };
                match model.insert(&txn).await {
                    Ok(_) => ReactionChange::Added,
                    Err(e) => match e.sql_err() {
                        Some(SqlErr::UniqueConstraintViolation(msg)) => {
                            return Err(AppError::Conflict(msg));
                        }
                        _ => return Err(AppError::Database(e.to_string())),
                    },
                }
            }
            Some(r) if r.kind == kind => {
                r.delete(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                ReactionChange::Removed
            }
            Some(r) => {
                let mut model: reaction::ActiveModel = r.into();
                model.kind = Set(kind);
                model
                    .update(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                ReactionChange::Flipped
            }
        };

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(change)
    }

    /// Aggregate like/dislike counts for a photo.
    pub async fn counts(&self, photo_id: &str) -> AppResult<ReactionCounts> {
        let likes = Reaction::find()
            .filter(reaction::Column::PhotoId.eq(photo_id))
            .filter(reaction::Column::Kind.eq(ReactionKind::Like))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let dislikes = Reaction::find()
            .filter(reaction::Column::PhotoId.eq(photo_id))
            .filter(reaction::Column::Kind.eq(ReactionKind::Dislike))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ReactionCounts { likes, dislikes })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_reaction(id: &str, user_id: &str, photo_id: &str, kind: ReactionKind) -> reaction::Model {
        reaction::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            photo_id: photo_id.to_string(),
            kind,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_user_and_photo() {
        let reaction = create_test_reaction("r1", "u1", "p1", ReactionKind::Like);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[reaction.clone()]])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let found = repo.find_by_user_and_photo("u1", "p1").await.unwrap();

        assert!(found.is_some());
        assert_eq!(found.unwrap().kind, ReactionKind::Like);
    }

    #[tokio::test]
    async fn test_toggle_removes_same_kind() {
        let existing = create_test_reaction("r1", "u1", "p1", ReactionKind::Like);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let change = repo
            .toggle("r2".to_string(), "u1", "p1", ReactionKind::Like)
            .await
            .unwrap();

        assert_eq!(change, ReactionChange::Removed);
    }

    #[tokio::test]
    async fn test_toggle_flips_opposite_kind() {
        let existing = create_test_reaction("r1", "u1", "p1", ReactionKind::Like);
        let flipped = create_test_reaction("r1", "u1", "p1", ReactionKind::Dislike);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .append_query_results([[flipped]])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let change = repo
            .toggle("r2".to_string(), "u1", "p1", ReactionKind::Dislike)
            .await
            .unwrap();

        assert_eq!(change, ReactionChange::Flipped);
    }

    #[test]
    fn test_opposite_kind() {
        assert_eq!(ReactionKind::Like.opposite(), ReactionKind::Dislike);
        assert_eq!(ReactionKind::Dislike.opposite(), ReactionKind::Like);
    }
}
