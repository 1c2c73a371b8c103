//! Tag repository.

use std::sync::Arc;

use crate::entities::{BlogTag, Tag, blog_tag, tag};
use super::{like_pattern, write_error};
use inkpost_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a tag by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<tag::Model>> {
        Tag::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a tag by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<tag::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag: {id}")))
    }

    /// Find a tag by name. Names are stored lowercased.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::Name.eq(name.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find tags by a set of (already lowercased) names.
    pub async fn find_by_names(&self, names: &[String]) -> AppResult<Vec<tag::Model>> {
        if names.is_empty() {
            return Ok(vec![]);
        }

        Tag::find()
            .filter(tag::Column::Name.is_in(names.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List tags, most used first.
    pub async fn list(
        &self,
        active_only: bool,
        search: Option<&str>,
        limit: u64,
    ) -> AppResult<Vec<tag::Model>> {
        let mut query = Tag::find();

        if active_only {
            query = query.filter(tag::Column::IsActive.eq(true));
        }

        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            query = query.filter(tag::Column::Name.like(pattern));
        }

        query
            .order_by_desc(tag::Column::BlogCount)
            .order_by_asc(tag::Column::Name)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tags attached to each of the given blog posts, as `(blog_id, tag)` pairs.
    pub async fn find_for_blogs(
        &self,
        blog_ids: &[String],
    ) -> AppResult<Vec<(String, tag::Model)>> {
        if blog_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = BlogTag::find()
            .filter(blog_tag::Column::BlogId.is_in(blog_ids.to_vec()))
            .find_also_related(Tag)
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(link, tag)| tag.map(|t| (link.blog_id, t)))
            .collect())
    }

    /// Create a new tag.
    pub async fn create(&self, model: tag::ActiveModel) -> AppResult<tag::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| write_error("Tag", e))
    }

    /// Update a tag.
    pub async fn update(&self, model: tag::ActiveModel) -> AppResult<tag::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| write_error("Tag", e))
    }

    /// Delete a tag. Links to blog posts go with it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = Tag::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Tag: {id}")));
        }

        Ok(())
    }

    /// Decrement the blog count of several tags, never going below zero.
    pub async fn decrement_blog_counts(&self, ids: &[String]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        Tag::update_many()
            .col_expr(
                tag::Column::BlogCount,
                Expr::cust("GREATEST(blog_count - 1, 0)"),
            )
            .filter(tag::Column::Id.is_in(ids.to_vec()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Count all tags.
    pub async fn count(&self) -> AppResult<u64> {
        Tag::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
