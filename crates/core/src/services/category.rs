//! Category service.

use chrono::{DateTime, FixedOffset};
use inkpost_common::{AppError, AppResult, IdGenerator};
use inkpost_db::{entities::category, repositories::CategoryRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::derived::{is_hex_color, slugify};
use super::identity::Caller;

const DEFAULT_COLOR: &str = "#3B82F6";
const DEFAULT_ICON: &str = "📝";
const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 100;

/// Input for creating a category.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 50))]
    pub name: String,

    #[validate(length(max = 200))]
    pub description: Option<String>,

    pub color: Option<String>,

    #[validate(length(max = 16))]
    pub icon: Option<String>,
}

/// Input for updating a category. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,

    #[validate(length(max = 200))]
    pub description: Option<String>,

    pub color: Option<String>,

    #[validate(length(max = 16))]
    pub icon: Option<String>,

    pub is_active: Option<bool>,
}

/// Category as shown to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub icon: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub blog_count: i32,
    pub created_at: DateTime<FixedOffset>,
}

impl From<category::Model> for CategoryView {
    fn from(c: category::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            color: c.color,
            icon: c.icon,
            description: c.description,
            is_active: c.is_active,
            blog_count: c.blog_count,
            created_at: c.created_at,
        }
    }
}

pub(super) fn require_admin(caller: &Caller) -> AppResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

pub(super) fn check_color(color: Option<&str>) -> AppResult<()> {
    match color {
        Some(c) if !is_hex_color(c) => Err(AppError::Validation(
            "Color must be a hex value like #3B82F6".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Service for managing categories.
#[derive(Clone)]
pub struct CategoryService {
    category_repo: CategoryRepository,
    id_gen: IdGenerator,
}

impl CategoryService {
    /// Create a new category service.
    #[must_use]
    pub const fn new(category_repo: CategoryRepository) -> Self {
        Self {
            category_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// List categories, most used first.
    pub async fn list(
        &self,
        active_only: bool,
        limit: Option<u64>,
    ) -> AppResult<Vec<CategoryView>> {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .min(MAX_LIST_LIMIT);

        let categories = self.category_repo.list(active_only, limit).await?;
        Ok(categories.into_iter().map(Into::into).collect())
    }

    /// Get a category by ID.
    pub async fn get(&self, id: &str) -> AppResult<CategoryView> {
        Ok(self.category_repo.get_by_id(id).await?.into())
    }

    /// Create a category.
    pub async fn create(
        &self,
        caller: &Caller,
        input: CreateCategoryInput,
    ) -> AppResult<CategoryView> {
        require_admin(caller)?;
        input.validate()?;
        check_color(input.color.as_deref())?;

        let name = input.name.trim().to_string();
        if self.category_repo.find_by_name(&name).await?.is_some() {
            return Err(AppError::Conflict(format!("Category already exists: {name}")));
        }

        let model = category::ActiveModel {
            id: Set(self.id_gen.generate()),
            slug: Set(slugify(&name)),
            name: Set(name),
            color: Set(input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
            icon: Set(input.icon.unwrap_or_else(|| DEFAULT_ICON.to_string())),
            description: Set(input.description),
            is_active: Set(true),
            blog_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let category = self.category_repo.create(model).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "Created category");

        Ok(category.into())
    }

    /// Update a category.
    pub async fn update(
        &self,
        caller: &Caller,
        id: &str,
        input: UpdateCategoryInput,
    ) -> AppResult<CategoryView> {
        require_admin(caller)?;
        input.validate()?;
        check_color(input.color.as_deref())?;

        let existing = self.category_repo.get_by_id(id).await?;
        let mut model: category::ActiveModel = existing.clone().into();

        if let Some(name) = input.name.map(|n| n.trim().to_string())
            && name != existing.name
        {
            if self.category_repo.find_by_name(&name).await?.is_some() {
                return Err(AppError::Conflict(format!("Category already exists: {name}")));
            }
            model.slug = Set(slugify(&name));
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(Some(description));
        }
        if let Some(color) = input.color {
            model.color = Set(color);
        }
        if let Some(icon) = input.icon {
            model.icon = Set(icon);
        }
        if let Some(is_active) = input.is_active {
            model.is_active = Set(is_active);
        }
        model.updated_at = Set(Some(chrono::Utc::now().into()));

        Ok(self.category_repo.update(model).await?.into())
    }

    /// Delete a category that no post references.
    pub async fn delete(&self, caller: &Caller, id: &str) -> AppResult<()> {
        require_admin(caller)?;
        self.category_repo.delete(id).await?;
        tracing::info!(category_id = %id, "Deleted category");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::identity::Role;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_category(id: &str, name: &str) -> category::Model {
        category::Model {
            id: id.to_string(),
            name: name.to_string(),
            slug: slugify(name),
            color: DEFAULT_COLOR.to_string(),
            icon: DEFAULT_ICON.to_string(),
            description: None,
            is_active: true,
            blog_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn admin() -> Caller {
        Caller::new("admin1", Role::Admin)
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = CategoryService::new(CategoryRepository::new(db));

        let input = CreateCategoryInput {
            name: "Rust".to_string(),
            description: None,
            color: None,
            icon: None,
        };

        let result = service.create(&Caller::new("u1", Role::User), input).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_color() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = CategoryService::new(CategoryRepository::new(db));

        let input = CreateCategoryInput {
            name: "Rust".to_string(),
            description: None,
            color: Some("blue".to_string()),
            icon: None,
        };

        let result = service.create(&admin(), input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_duplicate_name_conflicts() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_category("c1", "Rust")]])
                .into_connection(),
        );
        let service = CategoryService::new(CategoryRepository::new(db));

        let input = CreateCategoryInput {
            name: "Rust".to_string(),
            description: None,
            color: None,
            icon: None,
        };

        let result = service.create(&admin(), input).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_derives_slug() {
        let created = create_test_category("c1", "Web Development");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<category::Model>::new()])
                .append_query_results([[created]])
                .into_connection(),
        );
        let service = CategoryService::new(CategoryRepository::new(db));

        let input = CreateCategoryInput {
            name: "Web Development".to_string(),
            description: None,
            color: None,
            icon: None,
        };

        let view = service.create(&admin(), input).await.unwrap();
        assert_eq!(view.slug, "web-development");
        assert_eq!(view.color, DEFAULT_COLOR);
    }

    #[tokio::test]
    async fn test_list_maps_views() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_category("c1", "Rust")]])
                .into_connection(),
        );
        let service = CategoryService::new(CategoryRepository::new(db));

        let views = service.list(true, Some(10_000)).await.unwrap();
        assert_eq!(views.len(), 1);
    }
}
