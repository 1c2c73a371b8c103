//! Blog post service.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;

use chrono::{DateTime, FixedOffset};
use inkpost_common::{AppError, AppResult, IdGenerator, get_metrics};
use inkpost_db::{
    entities::{
        blog::{self, BlogStatus},
        category, tag, user,
    },
    repositories::{
        BlogListFilter, BlogRepository, BlogSortField, CategoryRepository, CommentRepository,
        TagRepository, TaxonomyChange, UserRepository,
    },
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::derived::{derive_excerpt, meta_description, read_time_minutes, slugify};
use super::identity::Caller;
use super::pagination::{PageRequest, Paginated, Pagination};
use super::tag::{TagService, check_tag_names};

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 50;
const SIMILAR_LIMIT: u64 = 3;

/// Input for creating a blog post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1))]
    pub content: String,

    #[validate(length(max = 300))]
    pub excerpt: Option<String>,

    pub category_id: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[validate(length(max = 500))]
    pub image_url: Option<String>,

    pub status: Option<BlogStatus>,
}

/// Input for updating a blog post. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1))]
    pub content: Option<String>,

    #[validate(length(max = 300))]
    pub excerpt: Option<String>,

    pub category_id: Option<String>,

    pub tags: Option<Vec<String>>,

    #[validate(length(max = 500))]
    pub image_url: Option<String>,

    pub status: Option<BlogStatus>,
}

/// Sort keys for post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlogSort {
    #[default]
    CreatedAt,
    Views,
    Likes,
    Title,
}

impl From<BlogSort> for BlogSortField {
    fn from(sort: BlogSort) -> Self {
        match sort {
            BlogSort::CreatedAt => Self::CreatedAt,
            BlogSort::Views => Self::Views,
            BlogSort::Likes => Self::Likes,
            BlogSort::Title => Self::Title,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl From<SortOrder> for sea_orm::Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Self::Asc,
            SortOrder::Desc => Self::Desc,
        }
    }
}

/// Listing parameters.
#[derive(Debug, Clone)]
pub struct BlogQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Category slug
    pub category: Option<String>,
    pub author_id: Option<String>,
    /// `None` lists every status.
    pub status: Option<BlogStatus>,
    pub search: Option<String>,
    pub sort: BlogSort,
    pub order: SortOrder,
}

impl Default for BlogQuery {
    fn default() -> Self {
        Self {
            page: None,
            limit: None,
            category: None,
            author_id: None,
            status: Some(BlogStatus::Published),
            search: None,
            sort: BlogSort::default(),
            order: SortOrder::default(),
        }
    }
}

/// Display fields of a user attached to posts and comments.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<user::Model> for AuthorRef {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            avatar_url: u.avatar_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub icon: String,
}

impl From<category::Model> for CategoryRef {
    fn from(c: category::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            color: c.color,
            icon: c.icon,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRef {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub color: String,
}

impl From<tag::Model> for TagRef {
    fn from(t: tag::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            slug: t.slug,
            color: t.color,
        }
    }
}

/// A post without its body, as used in listings and search results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogSummary {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub meta_description: String,
    pub slug: String,
    pub read_time: i32,
    pub author: Option<AuthorRef>,
    pub category: Option<CategoryRef>,
    pub tags: Vec<TagRef>,
    pub image_url: Option<String>,
    pub status: BlogStatus,
    pub views: i64,
    pub likes: i32,
    pub comment_count: i32,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// A full post.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogView {
    #[serde(flatten)]
    pub summary: BlogSummary,
    pub content: String,
    /// Whether the caller likes the post; absent for anonymous readers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
}

/// Outcome of a like toggle on a post.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct BlogLikeState {
    pub liked: bool,
    pub likes: i32,
}

/// Service for blog posts.
#[derive(Clone)]
pub struct BlogService {
    blog_repo: BlogRepository,
    user_repo: UserRepository,
    category_repo: CategoryRepository,
    tag_repo: TagRepository,
    comment_repo: CommentRepository,
    tag_service: TagService,
    id_gen: IdGenerator,
}

impl BlogService {
    /// Create a new blog service.
    #[must_use]
    pub fn new(
        blog_repo: BlogRepository,
        user_repo: UserRepository,
        category_repo: CategoryRepository,
        tag_repo: TagRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            blog_repo,
            user_repo,
            category_repo,
            tag_service: TagService::new(tag_repo.clone()),
            tag_repo,
            comment_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Publish a new post. Category and tag counts move in the same transaction.
    pub async fn create(&self, caller: &Caller, input: CreateBlogInput) -> AppResult<BlogView> {
        input.validate()?;
        check_tag_names(&input.tags)?;

        if self
            .category_repo
            .find_by_id(&input.category_id)
            .await?
            .is_none()
        {
            return Err(AppError::Validation("Category does not exist".to_string()));
        }

        let tags = self.tag_service.resolve_or_create(&input.tags).await?;
        let tag_ids: Vec<String> = tags.iter().map(|t| t.id.clone()).collect();

        let title = input.title.trim().to_string();
        let excerpt = derive_excerpt(input.excerpt.as_deref(), &input.content);

        let model = blog::ActiveModel {
            id: Set(self.id_gen.generate()),
            slug: Set(slugify(&title)),
            title: Set(title),
            meta_description: Set(meta_description(&excerpt)),
            read_time_minutes: Set(read_time_minutes(&input.content)),
            excerpt: Set(excerpt),
            content: Set(input.content),
            author_id: Set(caller.id.clone()),
            category_id: Set(input.category_id),
            image_url: Set(input.image_url),
            status: Set(input.status.unwrap_or_default()),
            views: Set(0),
            like_count: Set(0),
            comment_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let blog = self.blog_repo.create(model, &tag_ids).await?;
        get_metrics().blogs_created.fetch_add(1, Ordering::Relaxed);
        tracing::info!(blog_id = %blog.id, author_id = %caller.id, "Created blog post");

        let summary = self.summaries(vec![blog.clone()]).await?.pop();
        Self::into_view(blog, summary, Some(false))
    }

    /// Get a post by ID. Every read counts as a view.
    pub async fn get(&self, id: &str, caller: Option<&Caller>) -> AppResult<BlogView> {
        let mut blog = self.blog_repo.get_by_id(id).await?;
        self.blog_repo.increment_views(id).await?;
        blog.views += 1;

        let liked = match caller {
            Some(caller) => Some(self.blog_repo.has_liked(id, &caller.id).await?),
            None => None,
        };

        let summary = self.summaries(vec![blog.clone()]).await?.pop();
        Self::into_view(blog, summary, liked)
    }

    /// Update a post. Only its author or an admin may do so.
    pub async fn update(
        &self,
        caller: &Caller,
        id: &str,
        input: UpdateBlogInput,
    ) -> AppResult<BlogView> {
        input.validate()?;
        if let Some(names) = &input.tags {
            check_tag_names(names)?;
        }

        let existing = self.blog_repo.get_by_id(id).await?;
        if !caller.can_modify(&existing.author_id) {
            return Err(AppError::Forbidden(
                "Only the author or an admin may edit this post".to_string(),
            ));
        }

        let mut change = TaxonomyChange::default();

        if let Some(category_id) = &input.category_id
            && *category_id != existing.category_id
        {
            if self.category_repo.find_by_id(category_id).await?.is_none() {
                return Err(AppError::Validation("Category does not exist".to_string()));
            }
            change.category = Some((existing.category_id.clone(), category_id.clone()));
        }

        if let Some(names) = &input.tags {
            let current: HashSet<String> = self.blog_repo.tag_ids(id).await?.into_iter().collect();
            let wanted: HashSet<String> = self
                .tag_service
                .resolve_or_create(names)
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect();

            change.removed_tag_ids = current.difference(&wanted).cloned().collect();
            change.added_tag_ids = wanted.difference(&current).cloned().collect();
        }

        let mut model: blog::ActiveModel = existing.clone().into();

        let title = input.title.map(|t| t.trim().to_string());
        if let Some(title) = title {
            model.slug = Set(slugify(&title));
            model.title = Set(title);
        }

        let content_changed = input
            .content
            .as_ref()
            .is_some_and(|c| *c != existing.content);
        let content = input.content.unwrap_or_else(|| existing.content.clone());

        let excerpt = match input.excerpt.as_deref() {
            Some(excerpt) => derive_excerpt(Some(excerpt), &content),
            // Only a generated excerpt follows the content
            None if content_changed
                && existing.excerpt == derive_excerpt(None, &existing.content) =>
            {
                derive_excerpt(None, &content)
            }
            None => existing.excerpt.clone(),
        };

        model.meta_description = Set(meta_description(&excerpt));
        model.read_time_minutes = Set(read_time_minutes(&content));
        model.excerpt = Set(excerpt);
        model.content = Set(content);

        if let Some((_, category_id)) = &change.category {
            model.category_id = Set(category_id.clone());
        }
        if let Some(image_url) = input.image_url {
            model.image_url = Set(Some(image_url));
        }
        if let Some(status) = input.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Some(chrono::Utc::now().into()));

        let blog = self.blog_repo.update(model, &change).await?;
        tracing::info!(blog_id = %blog.id, "Updated blog post");

        let liked = self.blog_repo.has_liked(id, &caller.id).await?;
        let summary = self.summaries(vec![blog.clone()]).await?.pop();
        Self::into_view(blog, summary, Some(liked))
    }

    /// Delete a post. Only its author or an admin may do so.
    ///
    /// The post, its tag links and its likes go in one transaction. Comment
    /// purge and category/tag count adjustments follow and are best-effort.
    pub async fn delete(&self, caller: &Caller, id: &str) -> AppResult<()> {
        let blog = self.blog_repo.get_by_id(id).await?;
        if !caller.can_modify(&blog.author_id) {
            return Err(AppError::Forbidden(
                "Only the author or an admin may delete this post".to_string(),
            ));
        }

        let tag_ids = self.blog_repo.tag_ids(id).await?;
        self.blog_repo.delete(id).await?;
        get_metrics().blogs_deleted.fetch_add(1, Ordering::Relaxed);
        tracing::info!(blog_id = %id, deleted_by = %caller.id, "Deleted blog post");

        match self.comment_repo.delete_by_blog(id).await {
            Ok(removed) => {
                tracing::debug!(blog_id = %id, removed, "Purged comments of deleted post");
            }
            Err(e) => {
                tracing::warn!(
                    blog_id = %id,
                    error = %e,
                    "Failed to purge comments of deleted post"
                );
                get_metrics().record_counter_sync_failure();
            }
        }

        if let Err(e) = self.category_repo.decrement_blog_count(&blog.category_id).await {
            tracing::warn!(
                blog_id = %id,
                category_id = %blog.category_id,
                error = %e,
                "Failed to decrement category blog count"
            );
            get_metrics().record_counter_sync_failure();
        }

        if let Err(e) = self.tag_repo.decrement_blog_counts(&tag_ids).await {
            tracing::warn!(blog_id = %id, error = %e, "Failed to decrement tag blog counts");
            get_metrics().record_counter_sync_failure();
        }

        Ok(())
    }

    /// Like or unlike a post.
    pub async fn toggle_like(&self, caller: &Caller, id: &str) -> AppResult<BlogLikeState> {
        self.blog_repo.get_by_id(id).await?;

        let (liked, likes) = self.blog_repo.toggle_like(id, &caller.id).await?;
        get_metrics().likes_toggled.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(blog_id = %id, user_id = %caller.id, liked, "Toggled blog like");

        Ok(BlogLikeState { liked, likes })
    }

    /// List posts.
    pub async fn list(&self, query: BlogQuery) -> AppResult<Paginated<BlogSummary>> {
        let page = PageRequest::new(query.page, query.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);

        let category_id = match query.category.as_deref().filter(|c| !c.is_empty()) {
            Some(slug) => match self.category_repo.find_by_slug(slug).await? {
                Some(category) => Some(category.id),
                None => {
                    return Ok(Paginated {
                        items: vec![],
                        pagination: Pagination::new(page, 0),
                    });
                }
            },
            None => None,
        };

        let filter = BlogListFilter {
            status: query.status,
            category_id,
            author_id: query.author_id,
            search: query.search,
        };

        let blogs = self
            .blog_repo
            .list(
                &filter,
                query.sort.into(),
                query.order.into(),
                page.limit,
                page.offset(),
            )
            .await?;
        let total = self.blog_repo.count_filtered(&filter).await?;

        Ok(Paginated {
            items: self.summaries(blogs).await?,
            pagination: Pagination::new(page, total),
        })
    }

    /// Every post by the caller, newest first, whatever its status.
    pub async fn my_posts(&self, caller: &Caller) -> AppResult<Vec<BlogSummary>> {
        let filter = BlogListFilter {
            author_id: Some(caller.id.clone()),
            ..Default::default()
        };
        self.summaries(self.blog_repo.list_all(&filter).await?).await
    }

    /// Every post, newest first.
    pub async fn list_all(&self) -> AppResult<Vec<BlogSummary>> {
        self.summaries(self.blog_repo.list_all(&BlogListFilter::default()).await?)
            .await
    }

    /// Published posts sharing the category or a tag with the given post.
    pub async fn similar(&self, id: &str) -> AppResult<Vec<BlogSummary>> {
        let blog = self.blog_repo.get_by_id(id).await?;
        let tag_ids = self.blog_repo.tag_ids(id).await?;
        let similar = self
            .blog_repo
            .find_similar(&blog, &tag_ids, SIMILAR_LIMIT)
            .await?;
        self.summaries(similar).await
    }

    /// Attach author, category and tag display fields, keeping input order.
    pub async fn summaries(&self, blogs: Vec<blog::Model>) -> AppResult<Vec<BlogSummary>> {
        if blogs.is_empty() {
            return Ok(vec![]);
        }

        let blog_ids: Vec<String> = blogs.iter().map(|b| b.id.clone()).collect();
        let author_ids = unique(blogs.iter().map(|b| &b.author_id));
        let category_ids = unique(blogs.iter().map(|b| &b.category_id));

        let authors: HashMap<String, AuthorRef> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u.into()))
            .collect();

        let categories: HashMap<String, CategoryRef> = self
            .category_repo
            .find_by_ids(&category_ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c.into()))
            .collect();

        let mut tags: HashMap<String, Vec<TagRef>> = HashMap::new();
        for (blog_id, tag) in self.tag_repo.find_for_blogs(&blog_ids).await? {
            tags.entry(blog_id).or_default().push(tag.into());
        }

        Ok(blogs
            .into_iter()
            .map(|b| BlogSummary {
                author: authors.get(&b.author_id).cloned(),
                category: categories.get(&b.category_id).cloned(),
                tags: tags.remove(&b.id).unwrap_or_default(),
                id: b.id,
                title: b.title,
                excerpt: b.excerpt,
                meta_description: b.meta_description,
                slug: b.slug,
                read_time: b.read_time_minutes,
                image_url: b.image_url,
                status: b.status,
                views: b.views,
                likes: b.like_count,
                comment_count: b.comment_count,
                created_at: b.created_at,
                updated_at: b.updated_at,
            })
            .collect())
    }

    fn into_view(
        blog: blog::Model,
        summary: Option<BlogSummary>,
        liked: Option<bool>,
    ) -> AppResult<BlogView> {
        let summary = summary
            .ok_or_else(|| AppError::Internal(format!("Missing summary for blog {}", blog.id)))?;

        Ok(BlogView {
            summary,
            content: blog.content,
            liked,
        })
    }
}

fn unique<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&String> = HashSet::new();
    ids.filter(|id| seen.insert(*id)).cloned().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::identity::Role;
    use chrono::Utc;
    use inkpost_db::entities::user::UserRole;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn create_test_blog(id: &str, author_id: &str) -> blog::Model {
        blog::Model {
            id: id.to_string(),
            title: "Hello".to_string(),
            content: "Some words here".to_string(),
            excerpt: derive_excerpt(None, "Some words here"),
            meta_description: "Some words here...".to_string(),
            slug: "hello".to_string(),
            read_time_minutes: 1,
            author_id: author_id.to_string(),
            category_id: "c1".to_string(),
            image_url: None,
            status: BlogStatus::Published,
            views: 4,
            like_count: 0,
            comment_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Ada".to_string(),
            email: format!("{id}@example.com"),
            password_hash: String::new(),
            role: UserRole::User,
            token: None,
            avatar_url: None,
            bio: None,
            is_verified: false,
            last_login: None,
            login_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_category(id: &str) -> category::Model {
        category::Model {
            id: id.to_string(),
            name: "Rust".to_string(),
            slug: "rust".to_string(),
            color: "#3B82F6".to_string(),
            icon: "📝".to_string(),
            description: None,
            is_active: true,
            blog_count: 1,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn no_tag_rows() -> Vec<BTreeMap<&'static str, Value>> {
        vec![]
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn service(db: Arc<DatabaseConnection>) -> BlogService {
        BlogService::new(
            BlogRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            CategoryRepository::new(db.clone()),
            TagRepository::new(db.clone()),
            CommentRepository::new(db),
        )
    }

    #[test]
    fn test_unique_keeps_first_seen_order() {
        let ids = ["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(unique(ids.iter()), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_get_counts_view_and_hydrates() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("b1", "u1")]])
                .append_exec_results([exec(1)])
                .append_query_results([[create_test_user("u1")]])
                .append_query_results([[create_test_category("c1")]])
                .append_query_results([no_tag_rows()])
                .into_connection(),
        );

        let view = service(db).get("b1", None).await.unwrap();
        assert_eq!(view.summary.views, 5);
        assert_eq!(view.summary.author.unwrap().name, "Ada");
        assert_eq!(view.summary.category.unwrap().slug, "rust");
        assert!(view.liked.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_category() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<category::Model>::new()])
                .into_connection(),
        );

        let input = CreateBlogInput {
            title: "Hello".to_string(),
            content: "Body".to_string(),
            excerpt: None,
            category_id: "missing".to_string(),
            tags: vec![],
            image_url: None,
            status: None,
        };

        let result = service(db).create(&Caller::new("u1", Role::User), input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_with_overlong_tag_writes_nothing() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let blogs = service(db.clone());

        let input = CreateBlogInput {
            title: "Hello".to_string(),
            content: "Body".to_string(),
            excerpt: None,
            category_id: "c1".to_string(),
            tags: vec!["rust".to_string(), "x".repeat(40)],
            image_url: None,
            status: None,
        };

        let result = blogs.create(&Caller::new("u1", Role::User), input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        drop(blogs);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_update_with_overlong_tag_is_rejected() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let input = UpdateBlogInput {
            tags: Some(vec!["y".repeat(31)]),
            ..Default::default()
        };

        let result = service(db)
            .update(&Caller::new("u1", Role::User), "b1", input)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_by_stranger_is_forbidden() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("b1", "u1")]])
                .into_connection(),
        );

        let result = service(db)
            .update(
                &Caller::new("u2", Role::User),
                "b1",
                UpdateBlogInput::default(),
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_by_stranger_is_forbidden() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("b1", "u1")]])
                .into_connection(),
        );

        let result = service(db).delete(&Caller::new("u2", Role::User), "b1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_survives_failed_follow_up_writes() {
        // The post delete commits; the comment purge and count updates have no
        // mock results left and fail, which must not fail the call.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("b1", "u1")]])
                .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
                .append_exec_results([exec(0), exec(0), exec(1)])
                .into_connection(),
        );

        let before = get_metrics().counter_sync_failures.load(Ordering::Relaxed);
        service(db)
            .delete(&Caller::new("admin", Role::Admin), "b1")
            .await
            .unwrap();
        let after = get_metrics().counter_sync_failures.load(Ordering::Relaxed);
        assert!(after >= before + 2);
    }

    #[tokio::test]
    async fn test_toggle_like_missing_post() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<blog::Model>::new()])
                .into_connection(),
        );

        let result = service(db)
            .toggle_like(&Caller::new("u1", Role::User), "nope")
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_unknown_category_is_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<category::Model>::new()])
                .into_connection(),
        );

        let page = service(db)
            .list(BlogQuery {
                category: Some("nope".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total, 0);
        assert_eq!(page.pagination.pages, 0);
    }
}
