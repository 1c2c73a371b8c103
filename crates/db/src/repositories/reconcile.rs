//! Consistency repair for denormalized counters and orphaned comments.
//!
//! Every statement is idempotent: rows already in the right state are not
//! touched, so `rows_affected` counts actual repairs.

use std::sync::Arc;

use inkpost_common::{AppError, AppResult};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};

const PURGE_ORPHAN_COMMENTS: &str = r"
    DELETE FROM comment c
    WHERE NOT EXISTS (SELECT 1 FROM blog b WHERE b.id = c.blog_id)
";

const PURGE_ORPHAN_REPLIES: &str = r"
    DELETE FROM comment c
    WHERE c.parent_id IS NOT NULL
      AND NOT EXISTS (SELECT 1 FROM comment p WHERE p.id = c.parent_id)
";

const RECOUNT_BLOG_COMMENTS: &str = r"
    UPDATE blog b SET comment_count = s.n
    FROM (
        SELECT b2.id, COUNT(c.id)::INT AS n
        FROM blog b2
        LEFT JOIN comment c ON c.blog_id = b2.id
        GROUP BY b2.id
    ) s
    WHERE b.id = s.id AND b.comment_count <> s.n
";

const RECOUNT_BLOG_LIKES: &str = r"
    UPDATE blog b SET like_count = s.n
    FROM (
        SELECT b2.id, COUNT(l.user_id)::INT AS n
        FROM blog b2
        LEFT JOIN blog_like l ON l.blog_id = b2.id
        GROUP BY b2.id
    ) s
    WHERE b.id = s.id AND b.like_count <> s.n
";

const RECOUNT_CATEGORY_BLOGS: &str = r"
    UPDATE category c SET blog_count = s.n
    FROM (
        SELECT c2.id, COUNT(b.id)::INT AS n
        FROM category c2
        LEFT JOIN blog b ON b.category_id = c2.id
        GROUP BY c2.id
    ) s
    WHERE c.id = s.id AND c.blog_count <> s.n
";

const RECOUNT_TAG_BLOGS: &str = r"
    UPDATE tag t SET blog_count = s.n
    FROM (
        SELECT t2.id, COUNT(bt.blog_id)::INT AS n
        FROM tag t2
        LEFT JOIN blog_tag bt ON bt.tag_id = t2.id
        GROUP BY t2.id
    ) s
    WHERE t.id = s.id AND t.blog_count <> s.n
";

/// Repository running the repair statements.
#[derive(Clone)]
pub struct ReconcileRepository {
    db: Arc<DatabaseConnection>,
}

impl ReconcileRepository {
    /// Create a new reconcile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn run(&self, sql: &str) -> AppResult<u64> {
        let result = self
            .db
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Delete comments whose post no longer exists.
    pub async fn purge_orphan_comments(&self) -> AppResult<u64> {
        self.run(PURGE_ORPHAN_COMMENTS).await
    }

    /// Delete replies whose parent comment no longer exists.
    pub async fn purge_orphan_replies(&self) -> AppResult<u64> {
        self.run(PURGE_ORPHAN_REPLIES).await
    }

    /// Recompute `blog.comment_count`.
    pub async fn recount_blog_comments(&self) -> AppResult<u64> {
        self.run(RECOUNT_BLOG_COMMENTS).await
    }

    /// Recompute `blog.like_count`.
    pub async fn recount_blog_likes(&self) -> AppResult<u64> {
        self.run(RECOUNT_BLOG_LIKES).await
    }

    /// Recompute `category.blog_count`.
    pub async fn recount_category_blogs(&self) -> AppResult<u64> {
        self.run(RECOUNT_CATEGORY_BLOGS).await
    }

    /// Recompute `tag.blog_count`.
    pub async fn recount_tag_blogs(&self) -> AppResult<u64> {
        self.run(RECOUNT_TAG_BLOGS).await
    }
}
