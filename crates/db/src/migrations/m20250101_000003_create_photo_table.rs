//! Create photo table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Photo::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Photo::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Photo::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Photo::Slug).string_len(200).not_null())
                    .col(ColumnDef::new(Photo::ImageKey).string_len(256).not_null())
                    .col(ColumnDef::new(Photo::ImageUrl).string_len(512).not_null())
                    .col(ColumnDef::new(Photo::Description).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Photo::Category)
                            .string_len(20)
                            .not_null()
                            .default("other"),
                    )
                    .col(ColumnDef::new(Photo::UploaderId).string_len(32).null())
                    .col(
                        ColumnDef::new(Photo::IsFeatured)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Photo::ViewsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Photo::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_photo_uploader")
                            .from(Photo::Table, Photo::UploaderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: slug - the write-time slug guard
        manager
            .create_index(
                Index::create()
                    .name("idx_photo_slug")
                    .table(Photo::Table)
                    .col(Photo::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: category (filtered listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_photo_category")
                    .table(Photo::Table)
                    .col(Photo::Category)
                    .to_owned(),
            )
            .await?;

        // Index: uploader_id (per-user listings, quota counts)
        manager
            .create_index(
                Index::create()
                    .name("idx_photo_uploader_id")
                    .table(Photo::Table)
                    .col(Photo::UploaderId)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (ordering, adjacent lookups)
        manager
            .create_index(
                Index::create()
                    .name("idx_photo_created_at")
                    .table(Photo::Table)
                    .col(Photo::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Photo::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Photo {
    Table,
    Id,
    Title,
    Slug,
    ImageKey,
    ImageUrl,
    Description,
    Category,
    UploaderId,
    IsFeatured,
    ViewsCount,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
