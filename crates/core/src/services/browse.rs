//! Browsing and statistics service.
//!
//! Listing, filtering, sorting, pagination, previous/next and
//! related-by-shared-tags lookups, plus the aggregate statistics page.

use photoboard_common::{AppError, AppResult};
use photoboard_db::{
    entities::{photo, photo::PhotoCategory, tag},
    repositories::{PhotoListFilter, PhotoPage, PhotoRepository, TagRepository},
};
use sea_orm::Order;
use serde::Serialize;

/// Default listing page size.
pub const DEFAULT_PER_PAGE: u64 = 6;

/// Largest accepted page size.
pub const MAX_PER_PAGE: u64 = 50;

/// Related photos returned per lookup.
const RELATED_LIMIT: usize = 5;

/// Allow-listed sort keys.
///
/// Anything not in this list is a validation error — sort input is never
/// passed through to the query layer verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Newest first (the default).
    NewestFirst,
    /// Oldest first.
    OldestFirst,
    /// Title A→Z.
    TitleAsc,
    /// Title Z→A.
    TitleDesc,
    /// Most viewed first.
    ViewsDesc,
    /// Least viewed first.
    ViewsAsc,
}

impl SortKey {
    /// Parse a user-supplied sort field against the allow-list.
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::NewestFirst),
            Some("-uploaded_at") => Ok(Self::NewestFirst),
            Some("uploaded_at") => Ok(Self::OldestFirst),
            Some("title") => Ok(Self::TitleAsc),
            Some("-title") => Ok(Self::TitleDesc),
            Some("-views") => Ok(Self::ViewsDesc),
            Some("views") => Ok(Self::ViewsAsc),
            Some(other) => Err(AppError::Validation(format!(
                "Unknown sort field: {other}"
            ))),
        }
    }

    /// The column and direction this key sorts by.
    #[must_use]
    pub const fn ordering(self) -> (photo::Column, Order) {
        match self {
            Self::NewestFirst => (photo::Column::CreatedAt, Order::Desc),
            Self::OldestFirst => (photo::Column::CreatedAt, Order::Asc),
            Self::TitleAsc => (photo::Column::Title, Order::Asc),
            Self::TitleDesc => (photo::Column::Title, Order::Desc),
            Self::ViewsDesc => (photo::Column::ViewsCount, Order::Desc),
            Self::ViewsAsc => (photo::Column::ViewsCount, Order::Asc),
        }
    }
}

/// Per-category share of the photo store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    /// Category code.
    pub category: PhotoCategory,
    /// Photos in this category.
    pub count: u64,
    /// Share of all photos, 0.0 when the store is empty.
    pub percentage: f64,
}

/// Aggregate statistics over the photo store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoStats {
    /// Total photos.
    pub total_count: u64,
    /// Per-category counts and percentages, every category present.
    pub per_category: Vec<CategoryStat>,
    /// (year, count) pairs, ascending.
    pub per_year: Vec<(i32, u64)>,
    /// Upload time of the earliest photo.
    pub earliest: Option<chrono::DateTime<chrono::FixedOffset>>,
    /// Upload time of the latest photo.
    pub latest: Option<chrono::DateTime<chrono::FixedOffset>>,
}

/// Browsing service over the photo store.
#[derive(Clone)]
pub struct BrowseService {
    photo_repo: PhotoRepository,
    tag_repo: TagRepository,
}

impl BrowseService {
    /// Create a new browse service.
    #[must_use]
    pub const fn new(photo_repo: PhotoRepository, tag_repo: TagRepository) -> Self {
        Self { photo_repo, tag_repo }
    }

    /// List photos with conjunctive category/tag/year filters.
    ///
    /// `category` and `tag` arrive as user-facing codes (category code,
    /// tag slug). An unknown category is a validation error and an
    /// unknown tag is not found — neither silently yields an empty page.
    pub async fn list(
        &self,
        category: Option<&str>,
        tag: Option<&str>,
        year: Option<i32>,
        sort: SortKey,
        page: u64,
        per_page: u64,
    ) -> AppResult<PhotoPage> {
        let category = match category {
            Some(code) => Some(
                PhotoCategory::parse(code)
                    .ok_or_else(|| AppError::Validation(format!("Unknown category: {code}")))?,
            ),
            None => None,
        };

        let tag_id = match tag {
            Some(slug) => {
                let tag = self
                    .tag_repo
                    .find_by_slug(slug)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Tag: {slug}")))?;
                Some(tag.id)
            }
            None => None,
        };

        let filter = PhotoListFilter {
            category,
            tag_id,
            uploader_id: None,
            year,
        };

        self.photo_repo
            .list(
                &filter,
                sort.ordering(),
                page.max(1),
                per_page.clamp(1, MAX_PER_PAGE),
            )
            .await
    }

    /// A user's uploads, newest first.
    pub async fn list_by_user(
        &self,
        user_id: &str,
        page: u64,
        per_page: u64,
    ) -> AppResult<PhotoPage> {
        let filter = PhotoListFilter {
            uploader_id: Some(user_id.to_string()),
            ..PhotoListFilter::default()
        };

        self.photo_repo
            .list(
                &filter,
                SortKey::NewestFirst.ordering(),
                page.max(1),
                per_page.clamp(1, MAX_PER_PAGE),
            )
            .await
    }

    /// The photos on either side of this one in upload order.
    ///
    /// Previous is the most recent strictly-older photo, next the
    /// earliest strictly-newer one; `None` at the ends.
    pub async fn adjacent(
        &self,
        photo: &photo::Model,
    ) -> AppResult<(Option<photo::Model>, Option<photo::Model>)> {
        let previous = self.photo_repo.find_previous(photo.created_at, None).await?;
        let next = self.photo_repo.find_next(photo.created_at, None).await?;
        Ok((previous, next))
    }

    /// Adjacent photos within the same category.
    pub async fn adjacent_in_category(
        &self,
        photo: &photo::Model,
    ) -> AppResult<(Option<photo::Model>, Option<photo::Model>)> {
        let previous = self
            .photo_repo
            .find_previous(photo.created_at, Some(photo.category))
            .await?;
        let next = self
            .photo_repo
            .find_next(photo.created_at, Some(photo.category))
            .await?;
        Ok((previous, next))
    }

    /// Photos sharing at least one tag with this one, ranked by shared-tag
    /// count. Empty when the photo has no tags.
    pub async fn related(&self, photo: &photo::Model) -> AppResult<Vec<photo::Model>> {
        let tags = self.tag_repo.find_by_photo(&photo.id).await?;
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let tag_ids: Vec<String> = tags.into_iter().map(|t: tag::Model| t.id).collect();
        self.photo_repo
            .find_related(&photo.id, &tag_ids, RELATED_LIMIT)
            .await
    }

    /// Aggregate statistics: total, per-category shares, per-year counts
    /// and the timeline endpoints. Percentages are 0 on an empty store.
    pub async fn stats(&self) -> AppResult<PhotoStats> {
        let total_count = self.photo_repo.count().await?;
        let per_category_raw = self.photo_repo.count_per_category().await?;
        let per_year_raw = self.photo_repo.count_per_year().await?;
        let earliest = self.photo_repo.earliest().await?.map(|p| p.created_at);
        let latest = self.photo_repo.latest().await?.map(|p| p.created_at);

        let per_category = Self::category_shares(total_count, &per_category_raw);
        let per_year = per_year_raw
            .into_iter()
            .map(|(year, count)| (year, count.max(0) as u64))
            .collect();

        Ok(PhotoStats {
            total_count,
            per_category,
            per_year,
            earliest,
            latest,
        })
    }

    /// Every category with its count and share; zero-safe.
    fn category_shares(total: u64, raw: &[(PhotoCategory, i64)]) -> Vec<CategoryStat> {
        PhotoCategory::all()
            .into_iter()
            .map(|category| {
                let count = raw
                    .iter()
                    .find(|(c, _)| *c == category)
                    .map_or(0, |(_, n)| *n)
                    .max(0) as u64;
                let percentage = if total == 0 {
                    0.0
                } else {
                    (count as f64 / total as f64) * 100.0
                };
                CategoryStat {
                    category,
                    count,
                    percentage,
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_allow_list() {
        assert_eq!(SortKey::parse(None).unwrap(), SortKey::NewestFirst);
        assert_eq!(SortKey::parse(Some("")).unwrap(), SortKey::NewestFirst);
        assert_eq!(
            SortKey::parse(Some("-uploaded_at")).unwrap(),
            SortKey::NewestFirst
        );
        assert_eq!(SortKey::parse(Some("title")).unwrap(), SortKey::TitleAsc);
        assert_eq!(SortKey::parse(Some("-views")).unwrap(), SortKey::ViewsDesc);

        // Pass-through of arbitrary fields is rejected, not ignored.
        assert!(matches!(
            SortKey::parse(Some("uploaded_at; DROP TABLE photo")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            SortKey::parse(Some("id")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_category_shares_empty_store() {
        let shares = BrowseService::category_shares(0, &[]);

        assert_eq!(shares.len(), PhotoCategory::all().len());
        for stat in shares {
            assert_eq!(stat.count, 0);
            assert_eq!(stat.percentage, 0.0);
        }
    }

    #[test]
    fn test_category_shares_sum_to_hundred() {
        let raw = vec![
            (PhotoCategory::Nature, 3_i64),
            (PhotoCategory::People, 1_i64),
        ];
        let shares = BrowseService::category_shares(4, &raw);

        let nature = shares
            .iter()
            .find(|s| s.category == PhotoCategory::Nature)
            .unwrap();
        assert_eq!(nature.count, 3);
        assert_eq!(nature.percentage, 75.0);

        let total: f64 = shares.iter().map(|s| s.percentage).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }
}
