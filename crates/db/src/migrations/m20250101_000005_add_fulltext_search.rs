//! Add full-text search index for blog posts.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Uses 'simple' configuration so posts in any language are tokenized alike.
        // The expression must match the one in BlogRepository::search_fulltext.
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE INDEX IF NOT EXISTS idx_blog_text_search
                ON blog
                USING GIN (
                    to_tsvector('simple', title || ' ' || excerpt || ' ' || content)
                );
                ",
            )
            .await?;

        // Ranking by popularity (similar posts, top-N analytics)
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE INDEX IF NOT EXISTS idx_blog_views
                ON blog (views DESC, created_at DESC);
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_blog_text_search;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_blog_views;")
            .await?;

        Ok(())
    }
}
