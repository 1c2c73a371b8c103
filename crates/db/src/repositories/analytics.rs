//! Read-only aggregate queries backing the analytics reports.
//!
//! Day buckets are computed in UTC and rendered as `YYYY-MM-DD`.

use std::sync::Arc;

use crate::entities::{Blog, Comment, User, blog, comment, user};
use inkpost_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, Statement, Value, prelude::DateTimeWithTimeZone,
};

/// Sums over a set of blog posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromQueryResult)]
pub struct BlogTotalsRow {
    pub posts: i64,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
}

/// Per-day post activity.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct DailyBlogRow {
    pub date: String,
    pub posts: i64,
    pub views: i64,
    pub likes: i64,
}

/// A single per-day count.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct DailyCountRow {
    pub date: String,
    pub count: i64,
}

/// A post ranked by views, with display names joined in.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct TopBlogRow {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub created_at: DateTimeWithTimeZone,
    pub author_name: Option<String>,
    pub category_name: Option<String>,
}

/// A category or tag ranked by post count.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct RankedTermRow {
    pub id: String,
    pub name: String,
    pub color: String,
    pub posts: i64,
}

/// An author ranked by post count.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct TopAuthorRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub posts: i64,
    pub views: i64,
    pub likes: i64,
}

/// Counts over users created in a window.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromQueryResult)]
pub struct UserTotalsRow {
    pub users: i64,
    pub verified: i64,
    pub active: i64,
}

/// Day-bucketed series that can be requested from [`AnalyticsRepository::daily_counts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailySeries {
    /// Posts by creation day
    PostsCreated,
    /// Users by registration day
    UsersCreated,
    /// Users by last login day
    UsersActive,
}

impl DailySeries {
    const fn source(self) -> (&'static str, &'static str) {
        match self {
            Self::PostsCreated => ("blog", "created_at"),
            Self::UsersCreated => ("\"user\"", "created_at"),
            Self::UsersActive => ("\"user\"", "last_login"),
        }
    }
}

/// Analytics repository.
#[derive(Clone)]
pub struct AnalyticsRepository {
    db: Arc<DatabaseConnection>,
}

impl AnalyticsRepository {
    /// Create a new analytics repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Sum views, likes and comments over posts, optionally limited to those
    /// created at or after `since`.
    pub async fn blog_totals(
        &self,
        since: Option<DateTimeWithTimeZone>,
    ) -> AppResult<BlogTotalsRow> {
        let (filter, values): (&str, Vec<Value>) = match since {
            Some(since) => ("WHERE created_at >= $1", vec![since.into()]),
            None => ("", vec![]),
        };

        let sql = format!(
            r"
            SELECT COUNT(*)::BIGINT AS posts,
                   COALESCE(SUM(views), 0)::BIGINT AS views,
                   COALESCE(SUM(like_count), 0)::BIGINT AS likes,
                   COALESCE(SUM(comment_count), 0)::BIGINT AS comments
            FROM blog
            {filter}
            "
        );

        let row = BlogTotalsRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            &sql,
            values,
        ))
        .one(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.unwrap_or_default())
    }

    /// Posts created at or after `since`.
    pub async fn count_blogs_since(&self, since: DateTimeWithTimeZone) -> AppResult<u64> {
        Blog::find()
            .filter(blog::Column::CreatedAt.gte(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Users registered at or after `since`.
    pub async fn count_users_since(&self, since: DateTimeWithTimeZone) -> AppResult<u64> {
        User::find()
            .filter(user::Column::CreatedAt.gte(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments written at or after `since`.
    pub async fn count_comments_since(&self, since: DateTimeWithTimeZone) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::CreatedAt.gte(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Post count, view sum and like sum per creation day, oldest first.
    /// Days without posts are absent.
    pub async fn daily_blog_stats(
        &self,
        since: DateTimeWithTimeZone,
    ) -> AppResult<Vec<DailyBlogRow>> {
        let sql = r"
            SELECT to_char(date_trunc('day', created_at AT TIME ZONE 'UTC'), 'YYYY-MM-DD') AS date,
                   COUNT(*)::BIGINT AS posts,
                   COALESCE(SUM(views), 0)::BIGINT AS views,
                   COALESCE(SUM(like_count), 0)::BIGINT AS likes
            FROM blog
            WHERE created_at >= $1
            GROUP BY 1
            ORDER BY 1 ASC
            ";

        DailyBlogRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [since.into()],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Rows per UTC day for the given series, oldest first.
    pub async fn daily_counts(
        &self,
        series: DailySeries,
        since: DateTimeWithTimeZone,
    ) -> AppResult<Vec<DailyCountRow>> {
        let (table, column) = series.source();
        let sql = format!(
            r"
            SELECT to_char(date_trunc('day', {column} AT TIME ZONE 'UTC'), 'YYYY-MM-DD') AS date,
                   COUNT(*)::BIGINT AS count
            FROM {table}
            WHERE {column} >= $1
            GROUP BY 1
            ORDER BY 1 ASC
            "
        );

        DailyCountRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            &sql,
            [since.into()],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most viewed posts of all time.
    pub async fn top_blogs_by_views(&self, limit: u64) -> AppResult<Vec<TopBlogRow>> {
        let sql = format!(
            r#"
            SELECT b.id, b.title, b.slug, b.views,
                   b.like_count::BIGINT AS likes,
                   b.comment_count::BIGINT AS comments,
                   b.created_at,
                   u.name AS author_name,
                   c.name AS category_name
            FROM blog b
            LEFT JOIN "user" u ON u.id = b.author_id
            LEFT JOIN category c ON c.id = b.category_id
            ORDER BY b.views DESC, b.id ASC
            LIMIT {limit}
            "#
        );

        TopBlogRow::find_by_statement(Statement::from_string(DbBackend::Postgres, sql))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Categories with the most posts created at or after `since`.
    pub async fn top_categories(
        &self,
        since: DateTimeWithTimeZone,
        limit: u64,
    ) -> AppResult<Vec<RankedTermRow>> {
        let sql = format!(
            r"
            SELECT c.id, c.name, c.color, COUNT(b.id)::BIGINT AS posts
            FROM blog b
            JOIN category c ON c.id = b.category_id
            WHERE b.created_at >= $1
            GROUP BY c.id, c.name, c.color
            ORDER BY posts DESC, c.id ASC
            LIMIT {limit}
            "
        );

        RankedTermRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            &sql,
            [since.into()],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tags with the most posts created at or after `since`.
    pub async fn top_tags(
        &self,
        since: DateTimeWithTimeZone,
        limit: u64,
    ) -> AppResult<Vec<RankedTermRow>> {
        let sql = format!(
            r"
            SELECT t.id, t.name, t.color, COUNT(b.id)::BIGINT AS posts
            FROM blog b
            JOIN blog_tag bt ON bt.blog_id = b.id
            JOIN tag t ON t.id = bt.tag_id
            WHERE b.created_at >= $1
            GROUP BY t.id, t.name, t.color
            ORDER BY posts DESC, t.id ASC
            LIMIT {limit}
            "
        );

        RankedTermRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            &sql,
            [since.into()],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Users with the most authored posts of all time, with view and like
    /// totals across those posts.
    pub async fn top_authors(&self, limit: u64) -> AppResult<Vec<TopAuthorRow>> {
        let sql = format!(
            r#"
            SELECT u.id, u.name, u.email,
                   COUNT(b.id)::BIGINT AS posts,
                   COALESCE(SUM(b.views), 0)::BIGINT AS views,
                   COALESCE(SUM(b.like_count), 0)::BIGINT AS likes
            FROM "user" u
            LEFT JOIN blog b ON b.author_id = u.id
            GROUP BY u.id, u.name, u.email
            ORDER BY posts DESC, u.id ASC
            LIMIT {limit}
            "#
        );

        TopAuthorRow::find_by_statement(Statement::from_string(DbBackend::Postgres, sql))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Registration, verification and activity counts for users created at
    /// or after `since`.
    pub async fn user_totals(&self, since: DateTimeWithTimeZone) -> AppResult<UserTotalsRow> {
        let sql = r#"
            SELECT COUNT(*)::BIGINT AS users,
                   COUNT(*) FILTER (WHERE is_verified)::BIGINT AS verified,
                   COUNT(*) FILTER (WHERE login_count > 0)::BIGINT AS active
            FROM "user"
            WHERE created_at >= $1
            "#;

        let row = UserTotalsRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [since.into()],
        ))
        .one(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.unwrap_or_default())
    }
}
