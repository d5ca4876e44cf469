//! Tag repository.

use std::sync::Arc;

use crate::entities::{PhotoTag, Tag, photo_tag, tag};
use chrono::Utc;
use photoboard_common::{AppError, AppResult, slug};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    SqlErr,
};

/// Suffix retries for tag slug collisions.
const MAX_SLUG_ATTEMPTS: u32 = 50;

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a tag by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<tag::Model>> {
        Tag::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a tag by exact name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a tag by slug.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an existing tag by name, creating it if absent.
    ///
    /// A concurrent creation of the same name loses at the unique index
    /// and folds into a re-read; insert-and-fail never escapes.
    pub async fn get_or_create(&self, id: String, name: &str) -> AppResult<tag::Model> {
        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing);
        }

        let mut base = slug::slugify(name);
        if base.is_empty() {
            base = slug::fallback_slug("tag", &id);
        }

        for attempt in 0..MAX_SLUG_ATTEMPTS {
            let model = tag::ActiveModel {
                id: Set(id.clone()),
                name: Set(name.to_string()),
                slug: Set(slug::with_suffix(&base, attempt)),
                created_at: Set(Utc::now().into()),
            };

            match model.insert(self.db.as_ref()).await {
                Ok(created) => return Ok(created),
                Err(e) => match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("slug") => {}
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        // Lost a concurrent creation of the same name.
                        return self
                            .find_by_name(name)
                            .await?
                            .ok_or_else(|| AppError::NotFound(format!("Tag: {name}")));
                    }
                    _ => return Err(AppError::Database(e.to_string())),
                },
            }
        }

        Err(AppError::Conflict(format!(
            "Could not assign a unique slug for tag '{name}'"
        )))
    }

    /// Tags attached to a photo.
    pub async fn find_by_photo(&self, photo_id: &str) -> AppResult<Vec<tag::Model>> {
        let tag_ids: Vec<String> = PhotoTag::find()
            .select_only()
            .column(photo_tag::Column::TagId)
            .filter(photo_tag::Column::PhotoId.eq(photo_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        Tag::find()
            .filter(tag::Column::Id.is_in(tag_ids))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace a photo's tag set: stale links detached, new links
    /// attached, shared links left untouched.
    pub async fn set_photo_tags(
        &self,
        photo_id: &str,
        tag_ids: &[String],
        id_gen: &photoboard_common::IdGenerator,
    ) -> AppResult<()> {
        let existing: Vec<photo_tag::Model> = PhotoTag::find()
            .filter(photo_tag::Column::PhotoId.eq(photo_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let stale: Vec<String> = existing
            .iter()
            .filter(|link| !tag_ids.contains(&link.tag_id))
            .map(|link| link.id.clone())
            .collect();

        if !stale.is_empty() {
            PhotoTag::delete_many()
                .filter(photo_tag::Column::Id.is_in(stale))
                .exec(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        for tag_id in tag_ids {
            if existing.iter().any(|link| &link.tag_id == tag_id) {
                continue;
            }
            let model = photo_tag::ActiveModel {
                id: Set(id_gen.generate()),
                photo_id: Set(photo_id.to_string()),
                tag_id: Set(tag_id.clone()),
            };
            match model.insert(self.db.as_ref()).await {
                Ok(_) => {}
                Err(e) => match e.sql_err() {
                    // Pair already linked by a concurrent writer.
                    Some(SqlErr::UniqueConstraintViolation(_)) => {}
                    _ => return Err(AppError::Database(e.to_string())),
                },
            }
        }

        Ok(())
    }

    /// All tags with their usage counts, most used first.
    pub async fn list_with_counts(&self) -> AppResult<Vec<(tag::Model, u64)>> {
        let tags = Tag::find()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let counts: Vec<(String, i64)> = PhotoTag::find()
            .select_only()
            .column(photo_tag::Column::TagId)
            .column_as(photo_tag::Column::PhotoId.count(), "usage")
            .group_by(photo_tag::Column::TagId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut result: Vec<(tag::Model, u64)> = tags
            .into_iter()
            .map(|t| {
                let usage = counts
                    .iter()
                    .find(|(id, _)| *id == t.id)
                    .map_or(0, |(_, n)| *n)
                    .max(0) as u64;
                (t, usage)
            })
            .collect();

        result.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name.cmp(&b.0.name)));
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_tag(id: &str, name: &str) -> tag::Model {
        tag::Model {
            id: id.to_string(),
            name: name.to_string(),
            slug: slug::slugify(name),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_returns_existing() {
        let existing = create_test_tag("t1", "mountains");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing.clone()]])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let tag = repo.get_or_create("t2".to_string(), "mountains").await.unwrap();

        assert_eq!(tag.id, "t1");
    }

    #[tokio::test]
    async fn test_find_by_photo_empty_without_links() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<
                    std::collections::BTreeMap<&str, sea_orm::Value>,
                >::new()])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let tags = repo.find_by_photo("p1").await.unwrap();

        assert!(tags.is_empty());
    }
}
