//! Category repository.

use std::sync::Arc;

use super::write_error;
use crate::entities::{Blog, Category, blog, category};
use inkpost_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};

/// Category repository for database operations.
#[derive(Clone)]
pub struct CategoryRepository {
    db: Arc<DatabaseConnection>,
}

impl CategoryRepository {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a category by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<category::Model>> {
        Category::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a category by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<category::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category: {id}")))
    }

    /// Find categories by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<category::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Category::find()
            .filter(category::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a category by exact name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<category::Model>> {
        Category::find()
            .filter(category::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a category by slug.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<category::Model>> {
        Category::find()
            .filter(category::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List categories, most used first.
    pub async fn list(&self, active_only: bool, limit: u64) -> AppResult<Vec<category::Model>> {
        let mut query = Category::find();

        if active_only {
            query = query.filter(category::Column::IsActive.eq(true));
        }

        query
            .order_by_desc(category::Column::BlogCount)
            .order_by_asc(category::Column::Name)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new category.
    pub async fn create(&self, model: category::ActiveModel) -> AppResult<category::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| write_error("Category", e))
    }

    /// Update a category.
    pub async fn update(&self, model: category::ActiveModel) -> AppResult<category::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| write_error("Category", e))
    }

    /// Delete a category.
    ///
    /// Fails with `Conflict` while any blog post still references it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let category = self.get_by_id(id).await?;

        let in_use = Blog::find()
            .filter(blog::Column::CategoryId.eq(id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if in_use > 0 {
            return Err(AppError::Conflict(format!(
                "Category is used by {in_use} blog post(s)"
            )));
        }

        category
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Decrement the blog count, never going below zero.
    pub async fn decrement_blog_count(&self, id: &str) -> AppResult<()> {
        Category::update_many()
            .col_expr(
                category::Column::BlogCount,
                Expr::cust("GREATEST(blog_count - 1, 0)"),
            )
            .filter(category::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Count all categories.
    pub async fn count(&self) -> AppResult<u64> {
        Category::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
