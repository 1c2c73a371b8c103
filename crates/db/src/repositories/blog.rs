//! Blog post repository.

use std::sync::Arc;

use crate::entities::{
    Blog, BlogLike, BlogTag, Category, Tag,
    blog::{self, BlogStatus},
    blog_like, blog_tag, category, tag,
};
use super::like_pattern;
use inkpost_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbBackend,
    EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set,
    Statement, TransactionTrait,
    sea_query::{Expr, Func, OnConflict},
};

/// Filters for blog post listings.
#[derive(Debug, Clone, Default)]
pub struct BlogListFilter {
    /// `None` matches every status.
    pub status: Option<BlogStatus>,
    pub category_id: Option<String>,
    pub author_id: Option<String>,
    /// Case-insensitive substring of title, excerpt or content
    pub search: Option<String>,
}

/// Sortable columns for blog post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlogSortField {
    #[default]
    CreatedAt,
    Views,
    Likes,
    Title,
}

impl BlogSortField {
    const fn column(self) -> blog::Column {
        match self {
            Self::CreatedAt => blog::Column::CreatedAt,
            Self::Views => blog::Column::Views,
            Self::Likes => blog::Column::LikeCount,
            Self::Title => blog::Column::Title,
        }
    }
}

/// Category and tag moves applied alongside a post update.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyChange {
    /// `(old, new)` when the category changes
    pub category: Option<(String, String)>,
    pub removed_tag_ids: Vec<String>,
    pub added_tag_ids: Vec<String>,
}

/// Blog post repository for database operations.
#[derive(Clone)]
pub struct BlogRepository {
    db: Arc<DatabaseConnection>,
}

impl BlogRepository {
    /// Create a new blog repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<blog::Model>> {
        Blog::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<blog::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Blog: {id}")))
    }

    /// Tag IDs attached to a post.
    pub async fn tag_ids(&self, blog_id: &str) -> AppResult<Vec<String>> {
        BlogTag::find()
            .filter(blog_tag::Column::BlogId.eq(blog_id))
            .select_only()
            .column(blog_tag::Column::TagId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a post with its tag links and bump category/tag counts, atomically.
    pub async fn create(
        &self,
        model: blog::ActiveModel,
        tag_ids: &[String],
    ) -> AppResult<blog::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let blog = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Self::link_tags(&txn, &blog.id, tag_ids).await?;
        Self::shift_category(&txn, &blog.category_id, 1).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(blog)
    }

    /// Update a post and move category/tag links and counts, atomically.
    pub async fn update(
        &self,
        model: blog::ActiveModel,
        change: &TaxonomyChange,
    ) -> AppResult<blog::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let blog = model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some((old, new)) = &change.category
            && old != new
        {
            Self::shift_category(&txn, old, -1).await?;
            Self::shift_category(&txn, new, 1).await?;
        }

        if !change.removed_tag_ids.is_empty() {
            BlogTag::delete_many()
                .filter(blog_tag::Column::BlogId.eq(blog.id.as_str()))
                .filter(blog_tag::Column::TagId.is_in(change.removed_tag_ids.clone()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            Tag::update_many()
                .col_expr(
                    tag::Column::BlogCount,
                    Expr::cust("GREATEST(blog_count - 1, 0)"),
                )
                .filter(tag::Column::Id.is_in(change.removed_tag_ids.clone()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Self::link_tags(&txn, &blog.id, &change.added_tag_ids).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(blog)
    }

    async fn link_tags(
        txn: &DatabaseTransaction,
        blog_id: &str,
        tag_ids: &[String],
    ) -> AppResult<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let links = tag_ids.iter().map(|tag_id| blog_tag::ActiveModel {
            blog_id: Set(blog_id.to_string()),
            tag_id: Set(tag_id.clone()),
        });

        BlogTag::insert_many(links)
            .on_conflict(
                OnConflict::columns([blog_tag::Column::BlogId, blog_tag::Column::TagId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Tag::update_many()
            .col_expr(tag::Column::BlogCount, Expr::col(tag::Column::BlogCount).add(1))
            .filter(tag::Column::Id.is_in(tag_ids.to_vec()))
            .exec(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn shift_category(
        txn: &DatabaseTransaction,
        category_id: &str,
        delta: i32,
    ) -> AppResult<()> {
        let expr = if delta >= 0 {
            Expr::col(category::Column::BlogCount).add(delta)
        } else {
            Expr::cust(format!("GREATEST(blog_count - {}, 0)", delta.unsigned_abs()))
        };

        Category::update_many()
            .col_expr(category::Column::BlogCount, expr)
            .filter(category::Column::Id.eq(category_id))
            .exec(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Delete a post together with its tag links and likes, atomically.
    ///
    /// Comments and category/tag counts are left to the caller.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        BlogTag::delete_many()
            .filter(blog_tag::Column::BlogId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        BlogLike::delete_many()
            .filter(blog_like::Column::BlogId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let result = Blog::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Blog: {id}")));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Increment the view counter.
    pub async fn increment_views(&self, id: &str) -> AppResult<()> {
        Blog::update_many()
            .col_expr(blog::Column::Views, Expr::col(blog::Column::Views).add(1))
            .filter(blog::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Check whether a user has liked a post.
    pub async fn has_liked(&self, blog_id: &str, user_id: &str) -> AppResult<bool> {
        let count = BlogLike::find()
            .filter(blog_like::Column::BlogId.eq(blog_id))
            .filter(blog_like::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// Flip a user's like on a post.
    ///
    /// Returns whether the post is now liked by the user and the resulting
    /// like count. The counter only moves when a like row was actually
    /// inserted or removed.
    pub async fn toggle_like(&self, blog_id: &str, user_id: &str) -> AppResult<(bool, i32)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = BlogLike::delete_many()
            .filter(blog_like::Column::BlogId.eq(blog_id))
            .filter(blog_like::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .rows_affected;

        let liked = if removed > 0 {
            Blog::update_many()
                .col_expr(
                    blog::Column::LikeCount,
                    Expr::cust(format!("GREATEST(like_count - {removed}, 0)")),
                )
                .filter(blog::Column::Id.eq(blog_id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            false
        } else {
            let like = blog_like::ActiveModel {
                blog_id: Set(blog_id.to_string()),
                user_id: Set(user_id.to_string()),
                created_at: Set(chrono::Utc::now().into()),
            };

            let inserted = BlogLike::insert(like)
                .on_conflict(
                    OnConflict::columns([blog_like::Column::BlogId, blog_like::Column::UserId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            if inserted > 0 {
                Blog::update_many()
                    .col_expr(
                        blog::Column::LikeCount,
                        Expr::col(blog::Column::LikeCount).add(1),
                    )
                    .filter(blog::Column::Id.eq(blog_id))
                    .exec(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            true
        };

        let likes = Blog::find_by_id(blog_id)
            .select_only()
            .column(blog::Column::LikeCount)
            .into_tuple::<i32>()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Blog: {blog_id}")))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((liked, likes))
    }

    fn filtered(filter: &BlogListFilter) -> Condition {
        let mut condition = Condition::all();

        if let Some(status) = filter.status {
            condition = condition.add(blog::Column::Status.eq(status));
        }
        if let Some(category_id) = &filter.category_id {
            condition = condition.add(blog::Column::CategoryId.eq(category_id.as_str()));
        }
        if let Some(author_id) = &filter.author_id {
            condition = condition.add(blog::Column::AuthorId.eq(author_id.as_str()));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(Self::substring_condition(search));
        }

        condition
    }

    fn substring_condition(query: &str) -> Condition {
        let pattern = like_pattern(query);

        Condition::any()
            .add(Expr::expr(Func::lower(Expr::col(blog::Column::Title))).like(pattern.clone()))
            .add(Expr::expr(Func::lower(Expr::col(blog::Column::Excerpt))).like(pattern.clone()))
            .add(Expr::expr(Func::lower(Expr::col(blog::Column::Content))).like(pattern))
    }

    /// List posts matching a filter.
    pub async fn list(
        &self,
        filter: &BlogListFilter,
        sort: BlogSortField,
        order: Order,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<blog::Model>> {
        Blog::find()
            .filter(Self::filtered(filter))
            .order_by(sort.column(), order)
            .order_by_asc(blog::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every post matching a filter, newest first.
    pub async fn list_all(&self, filter: &BlogListFilter) -> AppResult<Vec<blog::Model>> {
        Blog::find()
            .filter(Self::filtered(filter))
            .order_by_desc(blog::Column::CreatedAt)
            .order_by_asc(blog::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count posts matching a filter.
    pub async fn count_filtered(&self, filter: &BlogListFilter) -> AppResult<u64> {
        Blog::find()
            .filter(Self::filtered(filter))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Published posts sharing the category or at least one tag with `blog`,
    /// most viewed first.
    pub async fn find_similar(
        &self,
        blog: &blog::Model,
        tag_ids: &[String],
        limit: u64,
    ) -> AppResult<Vec<blog::Model>> {
        let mut related =
            Condition::any().add(blog::Column::CategoryId.eq(blog.category_id.as_str()));

        if !tag_ids.is_empty() {
            let tagged = BlogTag::find()
                .select_only()
                .column(blog_tag::Column::BlogId)
                .filter(blog_tag::Column::TagId.is_in(tag_ids.to_vec()))
                .into_query();
            related = related.add(blog::Column::Id.in_subquery(tagged));
        }

        Blog::find()
            .filter(blog::Column::Id.ne(blog.id.as_str()))
            .filter(blog::Column::Status.eq(BlogStatus::Published))
            .filter(related)
            .order_by_desc(blog::Column::Views)
            .order_by_desc(blog::Column::CreatedAt)
            .order_by_asc(blog::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Full-text search over title, excerpt and content, best match first.
    pub async fn search_fulltext(&self, query: &str, limit: u64) -> AppResult<Vec<blog::Model>> {
        let sql = format!(
            r"
            SELECT * FROM blog
            WHERE to_tsvector('simple', title || ' ' || excerpt || ' ' || content)
                  @@ plainto_tsquery('simple', $1)
            ORDER BY ts_rank(
                         to_tsvector('simple', title || ' ' || excerpt || ' ' || content),
                         plainto_tsquery('simple', $1)
                     ) DESC,
                     created_at DESC
            LIMIT {limit}
            "
        );

        Blog::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &sql,
                [query.into()],
            ))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Case-insensitive substring search, newest first.
    pub async fn search_substring(&self, query: &str, limit: u64) -> AppResult<Vec<blog::Model>> {
        Blog::find()
            .filter(Self::substring_condition(query))
            .order_by_desc(blog::Column::CreatedAt)
            .order_by_asc(blog::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all posts.
    pub async fn count(&self) -> AppResult<u64> {
        Blog::find()
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

    fn create_test_blog(id: &str, category_id: &str) -> blog::Model {
        blog::Model {
            id: id.to_string(),
            title: "Hello World".to_string(),
            content: "Some content".to_string(),
            excerpt: "Some content".to_string(),
            meta_description: "Some content".to_string(),
            slug: "hello-world".to_string(),
            read_time_minutes: 1,
            author_id: "user1".to_string(),
            category_id: category_id.to_string(),
            image_url: None,
            status: BlogStatus::Published,
            views: 0,
            like_count: 0,
            comment_count: 0,
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
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<blog::Model>::new()])
                .into_connection(),
        );

        let repo = BlogRepository::new(db);
        match repo.get_by_id("missing").await {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Blog: missing"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_create_links_tags_and_counts() {
        let blog = create_test_blog("blog1", "cat1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[blog.clone()]])
                // tag links, tag counts, category count
                .append_exec_results([exec(2), exec(2), exec(1)])
                .into_connection(),
        );

        let repo = BlogRepository::new(db);
        let model = blog::ActiveModel {
            id: Set("blog1".to_string()),
            ..Default::default()
        };
        let created = repo
            .create(model, &["t1".to_string(), "t2".to_string()])
            .await
            .unwrap();
        assert_eq!(created.id, "blog1");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0), exec(0), exec(0)])
                .into_connection(),
        );

        let repo = BlogRepository::new(db);
        match repo.delete("missing").await {
            Err(AppError::NotFound(_)) => {}
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_toggle_like_adds_like() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // nothing to remove, insert one row, bump counter
                .append_exec_results([exec(0), exec(1), exec(1)])
                .append_query_results([[maplit::btreemap! {
                    "like_count" => sea_orm::Value::Int(Some(1))
                }]])
                .into_connection(),
        );

        let repo = BlogRepository::new(db);
        let (liked, likes) = repo.toggle_like("blog1", "user1").await.unwrap();
        assert!(liked);
        assert_eq!(likes, 1);
    }

    #[tokio::test]
    async fn test_toggle_like_removes_like() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1)])
                .append_query_results([[maplit::btreemap! {
                    "like_count" => sea_orm::Value::Int(Some(0))
                }]])
                .into_connection(),
        );

        let repo = BlogRepository::new(db);
        let (liked, likes) = repo.toggle_like("blog1", "user1").await.unwrap();
        assert!(!liked);
        assert_eq!(likes, 0);
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let a = create_test_blog("blog1", "cat1");
        let b = create_test_blog("blog2", "cat1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[a, b]])
                .into_connection(),
        );

        let repo = BlogRepository::new(db);
        let filter = BlogListFilter {
            status: Some(BlogStatus::Published),
            category_id: Some("cat1".to_string()),
            author_id: None,
            search: Some("hello".to_string()),
        };
        let result = repo
            .list(&filter, BlogSortField::Views, Order::Desc, 10, 0)
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_find_similar_queries_tag_links() {
        let blog = create_test_blog("blog1", "cat1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<blog::Model>::new()])
                .into_connection(),
        );

        let repo = BlogRepository::new(db.clone());
        let result = repo
            .find_similar(&blog, &["t1".to_string()], 3)
            .await
            .unwrap();
        assert!(result.is_empty());
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("blog_tag"));
        assert!(sql.contains("LIMIT"));
    }

    #[tokio::test]
    async fn test_search_fulltext_uses_ts_query() {
        let blog = create_test_blog("blog1", "cat1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[blog]])
                .into_connection(),
        );

        let repo = BlogRepository::new(db.clone());
        let result = repo.search_fulltext("hello", 20).await.unwrap();
        assert_eq!(result.len(), 1);
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("plainto_tsquery"));
        assert!(sql.contains("LIMIT 20"));
    }
}
