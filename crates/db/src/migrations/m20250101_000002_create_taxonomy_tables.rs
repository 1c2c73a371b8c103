//! Create category and tag tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Category::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Category::Name).string_len(50).not_null())
                    .col(ColumnDef::new(Category::Slug).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Category::Color)
                            .string_len(7)
                            .not_null()
                            .default("#3B82F6"),
                    )
                    .col(
                        ColumnDef::new(Category::Icon)
                            .string_len(16)
                            .not_null()
                            .default("📝"),
                    )
                    .col(ColumnDef::new(Category::Description).text().null())
                    .col(
                        ColumnDef::new(Category::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Category::BlogCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Category::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Category::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_category_name")
                    .table(Category::Table)
                    .col(Category::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_category_slug")
                    .table(Category::Table)
                    .col(Category::Slug)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tag::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Tag::Name).string_len(30).not_null())
                    .col(ColumnDef::new(Tag::Slug).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Tag::Color)
                            .string_len(7)
                            .not_null()
                            .default("#6B7280"),
                    )
                    .col(ColumnDef::new(Tag::Description).text().null())
                    .col(
                        ColumnDef::new(Tag::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Tag::BlogCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Tag::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tag::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tag_name")
                    .table(Tag::Table)
                    .col(Tag::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tag_slug")
                    .table(Tag::Table)
                    .col(Tag::Slug)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tag::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Category::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
    Name,
    Slug,
    Color,
    Icon,
    Description,
    IsActive,
    BlogCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tag {
    Table,
    Id,
    Name,
    Slug,
    Color,
    Description,
    IsActive,
    BlogCount,
    CreatedAt,
    UpdatedAt,
}
