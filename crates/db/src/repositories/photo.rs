//! Photo repository.
//!
//! Carries the browsing queries: filtered/sorted pagination, adjacent
//! lookups, related-by-shared-tags ranking and the aggregate statistics.

use std::sync::Arc;

use crate::entities::{Photo, PhotoTag, photo, photo::PhotoCategory, photo_tag};
use photoboard_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};

/// Slug collision retries before surfacing `Conflict`. With the unique
/// index in place a pass through this loop only loses to a concurrent
/// insert of the same base, so running dry is effectively unreachable.
const MAX_SLUG_ATTEMPTS: u32 = 50;

/// Conjunctive filters for photo listings.
#[derive(Debug, Clone, Default)]
pub struct PhotoListFilter {
    /// Restrict to a category.
    pub category: Option<PhotoCategory>,
    /// Restrict to photos carrying this tag.
    pub tag_id: Option<String>,
    /// Restrict to an uploader.
    pub uploader_id: Option<String>,
    /// Restrict to an upload year.
    pub year: Option<i32>,
}

/// One page of a photo listing.
#[derive(Debug, Clone)]
pub struct PhotoPage {
    /// Photos on this page.
    pub items: Vec<photo::Model>,
    /// 1-based page number.
    pub page: u64,
    /// Page size used.
    pub per_page: u64,
    /// Total matching photos.
    pub total_items: u64,
    /// Total pages at this page size.
    pub total_pages: u64,
}

/// Photo repository for database operations.
#[derive(Clone)]
pub struct PhotoRepository {
    db: Arc<DatabaseConnection>,
}

impl PhotoRepository {
    /// Create a new photo repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a photo by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<photo::Model>> {
        Photo::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a photo by ID, or fail with `PhotoNotFound`.
    pub async fn get_by_id(&self, id: &str) -> AppResult<photo::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PhotoNotFound(id.to_string()))
    }

    /// Find a photo by slug.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<photo::Model>> {
        Photo::find()
            .filter(photo::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a photo by slug, or fail with `PhotoNotFound`.
    pub async fn get_by_slug(&self, slug: &str) -> AppResult<photo::Model> {
        self.find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::PhotoNotFound(slug.to_string()))
    }

    /// Check whether a slug is taken.
    pub async fn slug_exists(&self, slug: &str) -> AppResult<bool> {
        Ok(self.find_by_slug(slug).await?.is_some())
    }

    /// Insert a photo, assigning the first free slug for `base`.
    ///
    /// Probes `base`, `base-1`, `base-2`, … and inserts; the probe is only
    /// an optimization — a concurrent creation with the same base loses at
    /// the unique index and rolls to the next suffix.
    pub async fn insert_with_slug(
        &self,
        mut model: photo::ActiveModel,
        base: &str,
    ) -> AppResult<photo::Model> {
        for attempt in 0..MAX_SLUG_ATTEMPTS {
            let candidate = photoboard_common::slug::with_suffix(base, attempt);
            if self.slug_exists(&candidate).await? {
                continue;
            }

            model.slug = Set(candidate);
            match model.clone().insert(self.db.as_ref()).await {
                Ok(created) => return Ok(created),
                Err(e) => match e.sql_err() {
                    // Lost the race for this suffix; try the next one.
                    Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("slug") => {}
                    Some(SqlErr::UniqueConstraintViolation(msg)) => {
                        return Err(AppError::Conflict(msg));
                    }
                    _ => return Err(AppError::Database(e.to_string())),
                },
            }
        }

        Err(AppError::Conflict(format!(
            "Could not assign a unique slug for '{base}'"
        )))
    }

    /// Update a photo.
    pub async fn update(&self, model: photo::ActiveModel) -> AppResult<photo::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a photo.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if let Some(photo) = self.find_by_id(id).await? {
            photo
                .delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Atomically increment the view counter.
    pub async fn increment_views(&self, id: &str) -> AppResult<()> {
        Photo::update_many()
            .col_expr(
                photo::Column::ViewsCount,
                Expr::col(photo::Column::ViewsCount).add(1),
            )
            .filter(photo::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List photos with conjunctive filters, explicit ordering and
    /// page-based pagination.
    pub async fn list(
        &self,
        filter: &PhotoListFilter,
        order: (photo::Column, Order),
        page: u64,
        per_page: u64,
    ) -> AppResult<PhotoPage> {
        let mut query = Photo::find();

        if let Some(category) = filter.category {
            query = query.filter(photo::Column::Category.eq(category));
        }
        if let Some(ref uploader_id) = filter.uploader_id {
            query = query.filter(photo::Column::UploaderId.eq(uploader_id));
        }
        if let Some(ref tag_id) = filter.tag_id {
            let tagged = Query::select()
                .column(photo_tag::Column::PhotoId)
                .from(PhotoTag)
                .and_where(Expr::col(photo_tag::Column::TagId).eq(tag_id.as_str()))
                .to_owned();
            query = query.filter(photo::Column::Id.in_subquery(tagged));
        }
        if let Some(year) = filter.year {
            query = query.filter(
                Expr::cust("CAST(EXTRACT(YEAR FROM created_at) AS INTEGER)").eq(year),
            );
        }

        // Secondary key keeps the ordering total when the primary ties.
        let query = query
            .order_by(order.0, order.1)
            .order_by(photo::Column::Id, Order::Desc);

        let paginator = query.paginate(self.db.as_ref(), per_page);
        let total_items = paginator
            .num_items()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let total_pages = paginator
            .num_pages()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(PhotoPage {
            items,
            page,
            per_page,
            total_items,
            total_pages,
        })
    }

    /// Most recent photo strictly older than `than`, optionally within a
    /// category. `None` at the end of the timeline.
    pub async fn find_previous(
        &self,
        than: sea_orm::prelude::DateTimeWithTimeZone,
        category: Option<PhotoCategory>,
    ) -> AppResult<Option<photo::Model>> {
        let mut query = Photo::find().filter(photo::Column::CreatedAt.lt(than));
        if let Some(category) = category {
            query = query.filter(photo::Column::Category.eq(category));
        }
        query
            .order_by_desc(photo::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Earliest photo strictly newer than `than`, optionally within a
    /// category.
    pub async fn find_next(
        &self,
        than: sea_orm::prelude::DateTimeWithTimeZone,
        category: Option<PhotoCategory>,
    ) -> AppResult<Option<photo::Model>> {
        let mut query = Photo::find().filter(photo::Column::CreatedAt.gt(than));
        if let Some(category) = category {
            query = query.filter(photo::Column::Category.eq(category));
        }
        query
            .order_by_asc(photo::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Photos sharing at least one of `tag_ids`, ranked by shared-tag
    /// count descending, ties broken by recency. Excludes `photo_id`.
    pub async fn find_related(
        &self,
        photo_id: &str,
        tag_ids: &[String],
        limit: usize,
    ) -> AppResult<Vec<photo::Model>> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        let shared: Vec<(String, i64)> = PhotoTag::find()
            .select_only()
            .column(photo_tag::Column::PhotoId)
            .column_as(photo_tag::Column::TagId.count(), "shared_tags")
            .filter(photo_tag::Column::TagId.is_in(tag_ids.to_vec()))
            .filter(photo_tag::Column::PhotoId.ne(photo_id))
            .group_by(photo_tag::Column::PhotoId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if shared.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = shared.iter().map(|(id, _)| id.clone()).collect();
        let candidates = Photo::find()
            .filter(photo::Column::Id.is_in(ids))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Self::rank_by_shared_tags(candidates, &shared, limit))
    }

    /// Order candidates by shared-tag count desc, then recency desc.
    fn rank_by_shared_tags(
        candidates: Vec<photo::Model>,
        shared: &[(String, i64)],
        limit: usize,
    ) -> Vec<photo::Model> {
        let mut ranked: Vec<(i64, photo::Model)> = candidates
            .into_iter()
            .map(|p| {
                let count = shared
                    .iter()
                    .find(|(id, _)| *id == p.id)
                    .map_or(0, |(_, n)| *n);
                (count, p)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.created_at.cmp(&a.1.created_at))
        });

        ranked.into_iter().take(limit).map(|(_, p)| p).collect()
    }

    /// Count all photos.
    pub async fn count(&self) -> AppResult<u64> {
        Photo::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count photos by uploader (upload quota checks).
    pub async fn count_by_uploader(&self, uploader_id: &str) -> AppResult<u64> {
        Photo::find()
            .filter(photo::Column::UploaderId.eq(uploader_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Photo counts grouped by category.
    pub async fn count_per_category(&self) -> AppResult<Vec<(PhotoCategory, i64)>> {
        Photo::find()
            .select_only()
            .column(photo::Column::Category)
            .column_as(photo::Column::Id.count(), "total")
            .group_by(photo::Column::Category)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Photo counts grouped by upload year, ascending.
    pub async fn count_per_year(&self) -> AppResult<Vec<(i32, i64)>> {
        let year: SimpleExpr =
            Expr::cust("CAST(EXTRACT(YEAR FROM created_at) AS INTEGER)").into();

        Photo::find()
            .select_only()
            .column_as(year.clone(), "year")
            .column_as(photo::Column::Id.count(), "total")
            .group_by(year.clone())
            .order_by_asc(year)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Earliest photo by upload time.
    pub async fn earliest(&self) -> AppResult<Option<photo::Model>> {
        Photo::find()
            .order_by_asc(photo::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Latest photo by upload time.
    pub async fn latest(&self) -> AppResult<Option<photo::Model>> {
        Photo::find()
            .order_by_desc(photo::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_photo(id: &str, slug: &str, hour: u32) -> photo::Model {
        photo::Model {
            id: id.to_string(),
            title: slug.to_string(),
            slug: slug.to_string(),
            image_key: format!("photos/{id}.jpg"),
            image_url: format!("/files/photos/{id}.jpg"),
            description: String::new(),
            category: PhotoCategory::Other,
            uploader_id: None,
            is_featured: false,
            views_count: 0,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_slug() {
        let photo = create_test_photo("p1", "sunset", 10);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[photo.clone()]])
                .into_connection(),
        );

        let repo = PhotoRepository::new(db);
        let found = repo.find_by_slug("sunset").await.unwrap();

        assert!(found.is_some());
        assert_eq!(found.unwrap().id, "p1");
    }

    #[tokio::test]
    async fn test_get_by_slug_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<photo::Model>::new()])
                .into_connection(),
        );

        let repo = PhotoRepository::new(db);
        let result = repo.get_by_slug("missing").await;

        assert!(matches!(result, Err(AppError::PhotoNotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_with_slug_suffixes_past_collision() {
        let taken = create_test_photo("p1", "sunset", 10);
        let mut created = create_test_photo("p2", "sunset-1", 11);
        created.title = "Sunset".to_string();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // Probe: "sunset" is taken
                .append_query_results([vec![taken]])
                // Probe: "sunset-1" is free
                .append_query_results([Vec::<photo::Model>::new()])
                // Insert succeeds
                .append_query_results([vec![created]])
                .into_connection(),
        );

        let model = photo::ActiveModel {
            id: Set("p2".to_string()),
            title: Set("Sunset".to_string()),
            slug: Set(String::new()),
            image_key: Set("photos/p2.jpg".to_string()),
            image_url: Set("/files/photos/p2.jpg".to_string()),
            description: Set(String::new()),
            category: Set(PhotoCategory::Other),
            uploader_id: Set(None),
            is_featured: Set(false),
            views_count: Set(0),
            created_at: Set(Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap().into()),
        };

        let repo = PhotoRepository::new(db);
        let inserted = repo.insert_with_slug(model, "sunset").await.unwrap();

        assert_eq!(inserted.slug, "sunset-1");
    }

    #[tokio::test]
    async fn test_increment_views_issues_single_update() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = PhotoRepository::new(db);
        repo.increment_views("p1").await.unwrap();
    }

    #[test]
    fn test_rank_by_shared_tags_orders_and_truncates() {
        let a = create_test_photo("a", "a", 1);
        let b = create_test_photo("b", "b", 2);
        let c = create_test_photo("c", "c", 3);

        let shared = vec![
            ("a".to_string(), 1_i64),
            ("b".to_string(), 3_i64),
            ("c".to_string(), 1_i64),
        ];

        let ranked =
            PhotoRepository::rank_by_shared_tags(vec![a, b, c], &shared, 2);

        // b has the most shared tags; c beats a on recency.
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "b");
        assert_eq!(ranked[1].id, "c");
    }
}
