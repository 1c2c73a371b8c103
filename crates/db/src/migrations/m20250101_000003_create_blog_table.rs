//! Create blog, blog_tag and blog_like tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Blog::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Blog::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Blog::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Blog::Content).text().not_null())
                    .col(ColumnDef::new(Blog::Excerpt).string_len(300).not_null())
                    .col(
                        ColumnDef::new(Blog::MetaDescription)
                            .string_len(160)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Blog::Slug).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Blog::ReadTimeMinutes)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Blog::AuthorId).string().not_null())
                    .col(ColumnDef::new(Blog::CategoryId).string().not_null())
                    .col(ColumnDef::new(Blog::ImageUrl).string().null())
                    .col(
                        ColumnDef::new(Blog::Status)
                            .string_len(16)
                            .not_null()
                            .default("published"),
                    )
                    .col(
                        ColumnDef::new(Blog::Views)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Blog::LikeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Blog::CommentCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Blog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Blog::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_author")
                            .from(Blog::Table, Blog::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_category")
                            .from(Blog::Table, Blog::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_status_created_at")
                    .table(Blog::Table)
                    .col(Blog::Status)
                    .col(Blog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_category_created_at")
                    .table(Blog::Table)
                    .col(Blog::CategoryId)
                    .col(Blog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_author_created_at")
                    .table(Blog::Table)
                    .col(Blog::AuthorId)
                    .col(Blog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_slug")
                    .table(Blog::Table)
                    .col(Blog::Slug)
                    .to_owned(),
            )
            .await?;

        // Tag links
        manager
            .create_table(
                Table::create()
                    .table(BlogTag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BlogTag::BlogId).string().not_null())
                    .col(ColumnDef::new(BlogTag::TagId).string().not_null())
                    .primary_key(Index::create().col(BlogTag::BlogId).col(BlogTag::TagId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_tag_blog")
                            .from(BlogTag::Table, BlogTag::BlogId)
                            .to(Blog::Table, Blog::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_tag_tag")
                            .from(BlogTag::Table, BlogTag::TagId)
                            .to(Tag::Table, Tag::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_tag_tag_id")
                    .table(BlogTag::Table)
                    .col(BlogTag::TagId)
                    .to_owned(),
            )
            .await?;

        // Likes: the composite primary key makes like/unlike a set operation
        manager
            .create_table(
                Table::create()
                    .table(BlogLike::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BlogLike::BlogId).string().not_null())
                    .col(ColumnDef::new(BlogLike::UserId).string().not_null())
                    .col(
                        ColumnDef::new(BlogLike::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(Index::create().col(BlogLike::BlogId).col(BlogLike::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_like_blog")
                            .from(BlogLike::Table, BlogLike::BlogId)
                            .to(Blog::Table, Blog::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_like_user")
                            .from(BlogLike::Table, BlogLike::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BlogLike::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BlogTag::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Blog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Blog {
    Table,
    Id,
    Title,
    Content,
    Excerpt,
    MetaDescription,
    Slug,
    ReadTimeMinutes,
    AuthorId,
    CategoryId,
    ImageUrl,
    Status,
    Views,
    LikeCount,
    CommentCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum BlogTag {
    Table,
    BlogId,
    TagId,
}

#[derive(Iden)]
enum BlogLike {
    Table,
    BlogId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
}

#[derive(Iden)]
enum Tag {
    Table,
    Id,
}
