//! Photo entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Photo category.
///
/// A closed enumeration stored as a short code on the photo row; there is
/// no category table to join against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum PhotoCategory {
    /// Nature and landscapes.
    #[sea_orm(string_value = "nature")]
    Nature,
    /// People and portraits.
    #[sea_orm(string_value = "people")]
    People,
    /// Architecture and cityscapes.
    #[sea_orm(string_value = "architecture")]
    Architecture,
    /// Animals and wildlife.
    #[sea_orm(string_value = "animals")]
    Animals,
    /// Everything else.
    #[sea_orm(string_value = "other")]
    Other,
}

impl Default for PhotoCategory {
    fn default() -> Self {
        Self::Other
    }
}

impl PhotoCategory {
    /// All categories, for listings and stats.
    #[must_use]
    pub fn all() -> Vec<Self> {
        use sea_orm::Iterable;
        Self::iter().collect()
    }

    /// Parse a category code.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "nature" => Some(Self::Nature),
            "people" => Some(Self::People),
            "architecture" => Some(Self::Architecture),
            "animals" => Some(Self::Animals),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// The stored code for this category.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Nature => "nature",
            Self::People => "people",
            Self::Architecture => "architecture",
            Self::Animals => "animals",
            Self::Other => "other",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "photo")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    /// URL-safe unique identifier derived from the title
    #[sea_orm(unique)]
    pub slug: String,

    /// Storage key of the image blob
    pub image_key: String,

    /// Public URL of the image
    pub image_url: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub category: PhotoCategory,

    /// Uploading user; NULL once the account is deleted
    #[sea_orm(nullable)]
    pub uploader_id: Option<String>,

    /// Featured on the front page
    #[sea_orm(default_value = false)]
    pub is_featured: bool,

    /// Detail-page view counter (monotonic)
    #[sea_orm(default_value = 0)]
    pub views_count: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UploaderId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Uploader,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::reaction::Entity")]
    Reactions,

    #[sea_orm(has_many = "super::photo_tag::Entity")]
    PhotoTags,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Uploader.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::photo_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::photo_tag::Relation::Photo.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(PhotoCategory::parse("nature"), Some(PhotoCategory::Nature));
        assert_eq!(PhotoCategory::parse("ANIMALS"), Some(PhotoCategory::Animals));
        assert_eq!(PhotoCategory::parse("portraits"), None);
    }

    #[test]
    fn test_category_code_round_trip() {
        for category in PhotoCategory::all() {
            assert_eq!(PhotoCategory::parse(category.code()), Some(category));
        }
    }
}
