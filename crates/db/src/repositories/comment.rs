//! Comment repository.

use std::sync::Arc;

use crate::entities::{Blog, Comment, CommentLike, blog, comment, comment_like};
use inkpost_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment: {id}")))
    }

    /// Top-level comments on a post, newest first.
    pub async fn find_top_level(
        &self,
        blog_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::BlogId.eq(blog_id))
            .filter(comment::Column::ParentId.is_null())
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count top-level comments on a post.
    pub async fn count_top_level(&self, blog_id: &str) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::BlogId.eq(blog_id))
            .filter(comment::Column::ParentId.is_null())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replies to any of the given comments, oldest first.
    pub async fn find_replies(&self, parent_ids: &[String]) -> AppResult<Vec<comment::Model>> {
        if parent_ids.is_empty() {
            return Ok(vec![]);
        }

        Comment::find()
            .filter(comment::Column::ParentId.is_in(parent_ids.to_vec()))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a comment and bump the post's comment count, atomically.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let comment = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Blog::update_many()
            .col_expr(
                blog::Column::CommentCount,
                Expr::col(blog::Column::CommentCount).add(1),
            )
            .filter(blog::Column::Id.eq(comment.blog_id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(comment)
    }

    /// Update a comment.
    pub async fn update(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment with all of its replies and lower the post's comment
    /// count by the number of rows removed, atomically.
    ///
    /// Returns the number of comments deleted.
    pub async fn delete_cascade(&self, target: &comment::Model) -> AppResult<u64> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = Comment::delete_many()
            .filter(
                Condition::any()
                    .add(comment::Column::Id.eq(target.id.as_str()))
                    .add(comment::Column::ParentId.eq(target.id.as_str())),
            )
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .rows_affected;

        if removed > 0 {
            Blog::update_many()
                .col_expr(
                    blog::Column::CommentCount,
                    Expr::cust(format!("GREATEST(comment_count - {removed}, 0)")),
                )
                .filter(blog::Column::Id.eq(target.blog_id.as_str()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(removed)
    }

    /// Delete every comment on a post. Comment likes go with them.
    pub async fn delete_by_blog(&self, blog_id: &str) -> AppResult<u64> {
        let result = Comment::delete_many()
            .filter(comment::Column::BlogId.eq(blog_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Like rows for a set of comments.
    pub async fn find_likes(
        &self,
        comment_ids: &[String],
    ) -> AppResult<Vec<comment_like::Model>> {
        if comment_ids.is_empty() {
            return Ok(vec![]);
        }

        CommentLike::find()
            .filter(comment_like::Column::CommentId.is_in(comment_ids.to_vec()))
            .order_by_asc(comment_like::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Flip a user's like on a comment.
    ///
    /// Returns whether the comment is now liked by the user and its like count.
    pub async fn toggle_like(&self, comment_id: &str, user_id: &str) -> AppResult<(bool, u64)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = CommentLike::delete_many()
            .filter(comment_like::Column::CommentId.eq(comment_id))
            .filter(comment_like::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .rows_affected;

        let liked = removed == 0;
        if liked {
            let like = comment_like::ActiveModel {
                comment_id: Set(comment_id.to_string()),
                user_id: Set(user_id.to_string()),
                created_at: Set(chrono::Utc::now().into()),
            };

            CommentLike::insert(like)
                .on_conflict(
                    OnConflict::columns([
                        comment_like::Column::CommentId,
                        comment_like::Column::UserId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        let count = CommentLike::find()
            .filter(comment_like::Column::CommentId.eq(comment_id))
            .count(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((liked, count))
    }

    /// Count all comments.
    pub async fn count(&self) -> AppResult<u64> {
        Comment::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_comment(id: &str, parent_id: Option<&str>) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            blog_id: "blog1".to_string(),
            author_id: "user1".to_string(),
            parent_id: parent_id.map(ToString::to_string),
            content: "Nice post".to_string(),
            is_edited: false,
            edited_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[tokio::test]
    async fn test_find_replies_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = CommentRepository::new(db);
        assert!(repo.find_replies(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_bumps_comment_count() {
        let comment = create_test_comment("c1", None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment.clone()]])
                .append_exec_results([exec(1)])
                .into_connection(),
        );

        let repo = CommentRepository::new(db.clone());
        let model = comment::ActiveModel {
            id: Set("c1".to_string()),
            ..Default::default()
        };
        let created = repo.create(model).await.unwrap();
        assert_eq!(created.id, "c1");
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let sql = format!("{log:?}");
        assert!(sql.contains("comment_count"));
    }

    #[tokio::test]
    async fn test_delete_cascade_returns_removed_rows() {
        let target = create_test_comment("c1", None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // comment plus two replies, then the counter update
                .append_exec_results([exec(3), exec(1)])
                .into_connection(),
        );

        let repo = CommentRepository::new(db.clone());
        assert_eq!(repo.delete_cascade(&target).await.unwrap(), 3);
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let sql = format!("{log:?}");
        assert!(sql.contains("GREATEST(comment_count - 3, 0)"));
    }

    #[tokio::test]
    async fn test_delete_cascade_nothing_removed_skips_counter() {
        let target = create_test_comment("c1", None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        assert_eq!(repo.delete_cascade(&target).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_toggle_like_on_then_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0), exec(1)])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let (liked, count) = repo.toggle_like("c1", "user1").await.unwrap();
        assert!(liked);
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_toggle_like_off() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1)])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(0))
                }]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let (liked, count) = repo.toggle_like("c1", "user1").await.unwrap();
        assert!(!liked);
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_find_top_level() {
        let a = create_test_comment("c2", None);
        let b = create_test_comment("c1", None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[a, b]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_top_level("blog1", 10, 0).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "c2");
    }
}
