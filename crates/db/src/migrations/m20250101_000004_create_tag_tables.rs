//! Create tag and photo_tag tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tag::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Tag::Name)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Tag::Slug)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Tag::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PhotoTag::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PhotoTag::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PhotoTag::PhotoId).string_len(32).not_null())
                    .col(ColumnDef::new(PhotoTag::TagId).string_len(32).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_photo_tag_photo")
                            .from(PhotoTag::Table, PhotoTag::PhotoId)
                            .to(Photo::Table, Photo::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_photo_tag_tag")
                            .from(PhotoTag::Table, PhotoTag::TagId)
                            .to(Tag::Table, Tag::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (photo_id, tag_id) - one link per pair
        manager
            .create_index(
                Index::create()
                    .name("idx_photo_tag_photo_tag")
                    .table(PhotoTag::Table)
                    .col(PhotoTag::PhotoId)
                    .col(PhotoTag::TagId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: tag_id (listing photos by tag, usage counts)
        manager
            .create_index(
                Index::create()
                    .name("idx_photo_tag_tag_id")
                    .table(PhotoTag::Table)
                    .col(PhotoTag::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PhotoTag::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tag::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Tag {
    Table,
    Id,
    Name,
    Slug,
    CreatedAt,
}

#[derive(Iden)]
enum PhotoTag {
    Table,
    Id,
    PhotoId,
    TagId,
}

#[derive(Iden)]
enum Photo {
    Table,
    Id,
}
