//! Tag service.

use chrono::{DateTime, FixedOffset};
use inkpost_common::{AppError, AppResult, IdGenerator};
use inkpost_db::{entities::tag, repositories::TagRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::category::{check_color, require_admin};
use super::derived::{normalize_tag_names, slugify};
use super::identity::Caller;

const DEFAULT_COLOR: &str = "#6B7280";
const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_TAG_NAME_CHARS: usize = 30;
const MAX_LIST_LIMIT: u64 = 100;

/// Reject any tag name longer than the `tag.name` column allows.
pub(super) fn check_tag_names(names: &[String]) -> AppResult<()> {
    if names.iter().any(|n| n.trim().to_lowercase().chars().count() > MAX_TAG_NAME_CHARS) {
        return Err(AppError::Validation(format!(
            "Tag names must be at most {MAX_TAG_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

/// Input for creating a tag.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagInput {
    #[validate(length(min = 1, max = 30))]
    pub name: String,

    #[validate(length(max = 150))]
    pub description: Option<String>,

    pub color: Option<String>,
}

/// Input for updating a tag.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagInput {
    #[validate(length(min = 1, max = 30))]
    pub name: Option<String>,

    #[validate(length(max = 150))]
    pub description: Option<String>,

    pub color: Option<String>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub blog_count: i32,
    pub created_at: DateTime<FixedOffset>,
}

impl From<tag::Model> for TagView {
    fn from(t: tag::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            slug: t.slug,
            color: t.color,
            description: t.description,
            is_active: t.is_active,
            blog_count: t.blog_count,
            created_at: t.created_at,
        }
    }
}

/// Query parameters for listing tags.
#[derive(Debug, Clone, Default)]
pub struct TagQuery {
    pub active_only: bool,
    pub search: Option<String>,
    pub limit: Option<u64>,
}

/// Service for managing tags.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
    id_gen: IdGenerator,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository) -> Self {
        Self {
            tag_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// List tags, most used first.
    pub async fn list(&self, query: TagQuery) -> AppResult<Vec<TagView>> {
        let limit = query
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .min(MAX_LIST_LIMIT);

        let tags = self
            .tag_repo
            .list(query.active_only, query.search.as_deref(), limit)
            .await?;
        Ok(tags.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: &str) -> AppResult<TagView> {
        Ok(self.tag_repo.get_by_id(id).await?.into())
    }

    /// Create a tag. The name is stored lowercased.
    pub async fn create(&self, caller: &Caller, input: CreateTagInput) -> AppResult<TagView> {
        require_admin(caller)?;
        input.validate()?;
        check_color(input.color.as_deref())?;

        let name = input.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(AppError::Validation("Tag name must not be blank".to_string()));
        }
        if self.tag_repo.find_by_name(&name).await?.is_some() {
            return Err(AppError::Conflict(format!("Tag already exists: {name}")));
        }

        let tag = self
            .tag_repo
            .create(self.new_model(name, input.color, input.description))
            .await?;
        tracing::info!(tag_id = %tag.id, name = %tag.name, "Created tag");

        Ok(tag.into())
    }

    /// Update a tag.
    pub async fn update(
        &self,
        caller: &Caller,
        id: &str,
        input: UpdateTagInput,
    ) -> AppResult<TagView> {
        require_admin(caller)?;
        input.validate()?;
        check_color(input.color.as_deref())?;

        let existing = self.tag_repo.get_by_id(id).await?;
        let mut model: tag::ActiveModel = existing.clone().into();

        if let Some(name) = input.name.map(|n| n.trim().to_lowercase())
            && name != existing.name
        {
            if self.tag_repo.find_by_name(&name).await?.is_some() {
                return Err(AppError::Conflict(format!("Tag already exists: {name}")));
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
        if let Some(is_active) = input.is_active {
            model.is_active = Set(is_active);
        }
        model.updated_at = Set(Some(chrono::Utc::now().into()));

        Ok(self.tag_repo.update(model).await?.into())
    }

    pub async fn delete(&self, caller: &Caller, id: &str) -> AppResult<()> {
        require_admin(caller)?;
        self.tag_repo.delete(id).await?;
        tracing::info!(tag_id = %id, "Deleted tag");
        Ok(())
    }

    /// Look up tags by name, creating the ones that do not exist yet.
    ///
    /// Names are normalized first; the result follows the normalized order.
    /// Every name is checked before anything is written.
    pub async fn resolve_or_create(&self, names: &[String]) -> AppResult<Vec<tag::Model>> {
        check_tag_names(names)?;
        let names = normalize_tag_names(names);
        if names.is_empty() {
            return Ok(vec![]);
        }

        let mut existing = self.tag_repo.find_by_names(&names).await?;
        let mut resolved = Vec::with_capacity(names.len());

        for name in names {
            if let Some(pos) = existing.iter().position(|t| t.name == name) {
                resolved.push(existing.swap_remove(pos));
                continue;
            }

            let tag = self.tag_repo.create(self.new_model(name, None, None)).await?;
            tracing::debug!(tag_id = %tag.id, name = %tag.name, "Created tag on first use");
            resolved.push(tag);
        }

        Ok(resolved)
    }

    fn new_model(
        &self,
        name: String,
        color: Option<String>,
        description: Option<String>,
    ) -> tag::ActiveModel {
        tag::ActiveModel {
            id: Set(self.id_gen.generate()),
            slug: Set(slugify(&name)),
            name: Set(name),
            color: Set(color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
            description: Set(description),
            is_active: Set(true),
            blog_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        }
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

    fn create_test_tag(id: &str, name: &str) -> tag::Model {
        tag::Model {
            id: id.to_string(),
            name: name.to_string(),
            slug: slugify(name),
            color: DEFAULT_COLOR.to_string(),
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
    async fn test_create_lowercases_name() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<tag::Model>::new()])
                .append_query_results([[create_test_tag("t1", "rust")]])
                .into_connection(),
        );
        let service = TagService::new(TagRepository::new(db.clone()));

        let input = CreateTagInput {
            name: "  RUST ".to_string(),
            description: None,
            color: None,
        };

        let view = service.create(&admin(), input).await.unwrap();
        assert_eq!(view.name, "rust");
        drop(service);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert!(format!("{log:?}").contains("\"rust\""));
    }

    #[tokio::test]
    async fn test_resolve_or_create_rejects_long_name_before_insert() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = TagService::new(TagRepository::new(db.clone()));

        let names = vec!["rust".to_string(), "x".repeat(31)];
        let result = service.resolve_or_create(&names).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        drop(service);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert!(log.is_empty());
    }

    #[test]
    fn test_check_tag_names_counts_chars() {
        assert!(check_tag_names(&["é".repeat(30)]).is_ok());
        assert!(check_tag_names(&[format!("  {}  ", "a".repeat(30))]).is_ok());
        assert!(check_tag_names(&["a".repeat(31)]).is_err());
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = TagService::new(TagRepository::new(db));

        let input = CreateTagInput {
            name: "rust".to_string(),
            description: None,
            color: None,
        };

        let result = service.create(&Caller::new("u1", Role::User), input).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_tag("t1", "rust")]])
                .into_connection(),
        );
        let service = TagService::new(TagRepository::new(db));

        let input = CreateTagInput {
            name: "Rust".to_string(),
            description: None,
            color: None,
        };

        let result = service.create(&admin(), input).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_resolve_or_create_reuses_existing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_tag("t1", "rust")]])
                .append_query_results([[create_test_tag("t2", "axum")]])
                .into_connection(),
        );
        let service = TagService::new(TagRepository::new(db));

        let names = vec!["Axum".to_string(), "rust".to_string(), "RUST".to_string()];
        let tags = service.resolve_or_create(&names).await.unwrap();

        let ids: Vec<_> = tags.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t1"]);
    }

    #[tokio::test]
    async fn test_resolve_or_create_empty_skips_queries() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = TagService::new(TagRepository::new(db));

        let tags = service
            .resolve_or_create(&[" ".to_string()])
            .await
            .unwrap();
        assert!(tags.is_empty());
    }
}
