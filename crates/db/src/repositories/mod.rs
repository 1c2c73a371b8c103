//! Database repositories.

#![allow(missing_docs)]

pub mod analytics;
pub mod blog;
pub mod category;
pub mod comment;
pub mod reconcile;
pub mod tag;
pub mod user;

pub use analytics::{
    AnalyticsRepository, BlogTotalsRow, DailyBlogRow, DailyCountRow, DailySeries, RankedTermRow,
    TopAuthorRow, TopBlogRow, UserTotalsRow,
};
pub use blog::{BlogListFilter, BlogRepository, BlogSortField, TaxonomyChange};
pub use category::CategoryRepository;
pub use comment::CommentRepository;
pub use reconcile::ReconcileRepository;
pub use tag::TagRepository;
pub use user::{UserListFilter, UserRepository};

use inkpost_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Map a failed insert or update. A unique-index hit means a concurrent
/// writer won the race past the service's own duplicate check.
pub(crate) fn write_error(what: &str, err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(format!("{what} already exists"))
        }
        _ => AppError::Database(err.to_string()),
    }
}

/// Escape a user string for use inside a `LIKE` pattern and wrap it in `%`.
pub(crate) fn like_pattern(query: &str) -> String {
    format!(
        "%{}%",
        query
            .to_lowercase()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_keeps_other_failures_as_database() {
        let err = write_error("Tag", DbErr::Custom("connection reset".to_string()));
        assert!(matches!(err, AppError::Database(msg) if msg.contains("connection reset")));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_Off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
