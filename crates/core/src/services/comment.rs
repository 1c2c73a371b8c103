//! Threaded comments.
//!
//! Comments nest one level deep: a top-level comment has no parent, and a
//! reply's parent is always a top-level comment on the same post. Replies are
//! never stored on their parent; they are looked up by `parent_id` when a
//! thread is read.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;

use chrono::{DateTime, FixedOffset};
use inkpost_common::{AppError, AppResult, IdGenerator, get_metrics};
use inkpost_db::{
    entities::comment,
    repositories::{BlogRepository, CommentRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::blog::AuthorRef;
use super::identity::Caller;
use super::pagination::PageRequest;

/// Longest accepted comment, in characters, after trimming.
pub const MAX_COMMENT_CHARS: usize = 1000;

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 50;

/// Trim comment content and check it is non-empty and not too long.
///
/// The error message never repeats the submitted content.
pub fn validate_content(content: &str) -> AppResult<String> {
    let trimmed = content.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "Comment content must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment content must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }

    Ok(trimmed.to_string())
}

/// Input for posting a comment or reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentInput {
    pub content: String,
    pub parent_comment_id: Option<String>,
}

/// Input for editing a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct EditCommentInput {
    pub content: String,
}

/// A comment with its author, likes and (for top-level comments) replies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub blog_id: String,
    pub content: String,
    pub author: Option<AuthorRef>,
    pub parent_comment_id: Option<String>,
    /// IDs of users who like the comment
    pub likes: Vec<String>,
    pub like_count: usize,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub replies: Vec<CommentView>,
}

impl CommentView {
    fn new(comment: comment::Model, author: Option<AuthorRef>, likes: Vec<String>) -> Self {
        Self {
            id: comment.id,
            blog_id: comment.blog_id,
            content: comment.content,
            author,
            parent_comment_id: comment.parent_id,
            like_count: likes.len(),
            likes,
            is_edited: comment.is_edited,
            edited_at: comment.edited_at,
            created_at: comment.created_at,
            replies: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentPagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_comments: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl CommentPagination {
    #[must_use]
    pub const fn new(request: PageRequest, total: u64) -> Self {
        Self {
            current_page: request.page,
            total_pages: request.total_pages(total),
            total_comments: total,
            has_next_page: request.has_next(total),
            has_prev_page: request.has_prev(),
        }
    }
}

/// One page of top-level comments with their replies.
#[derive(Debug, Clone, Serialize)]
pub struct CommentPage {
    pub comments: Vec<CommentView>,
    pub pagination: CommentPagination,
}

/// Outcome of a like toggle on a comment.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentLikeState {
    pub liked: bool,
    pub like_count: u64,
}

/// Service for threaded comments.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    blog_repo: BlogRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        blog_repo: BlogRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            blog_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Top-level comments on a post, newest first, each with its replies
    /// oldest first.
    pub async fn list(
        &self,
        blog_id: &str,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> AppResult<CommentPage> {
        self.blog_repo.get_by_id(blog_id).await?;

        let request = PageRequest::new(page, page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        let total = self.comment_repo.count_top_level(blog_id).await?;
        let top_level = self
            .comment_repo
            .find_top_level(blog_id, request.limit, request.offset())
            .await?;

        Ok(CommentPage {
            comments: self.threads(top_level).await?,
            pagination: CommentPagination::new(request, total),
        })
    }

    /// Post a comment, or a reply when `parent_comment_id` is set.
    pub async fn post(
        &self,
        caller: &Caller,
        blog_id: &str,
        input: PostCommentInput,
    ) -> AppResult<CommentView> {
        let content = validate_content(&input.content)?;
        self.blog_repo.get_by_id(blog_id).await?;

        if let Some(parent_id) = &input.parent_comment_id {
            let parent = self
                .comment_repo
                .find_by_id(parent_id)
                .await?
                .filter(|p| p.blog_id == blog_id)
                .ok_or_else(|| AppError::NotFound("reply target missing".to_string()))?;

            if parent.parent_id.is_some() {
                return Err(AppError::Validation("replies cannot be nested".to_string()));
            }
        }

        let now = chrono::Utc::now();
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            blog_id: Set(blog_id.to_string()),
            author_id: Set(caller.id.clone()),
            parent_id: Set(input.parent_comment_id),
            content: Set(content),
            is_edited: Set(false),
            edited_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let comment = self.comment_repo.create(model).await?;
        get_metrics().comments_created.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            comment_id = %comment.id,
            blog_id = %blog_id,
            reply = comment.parent_id.is_some(),
            "Posted comment"
        );

        let author = self.user_repo.find_by_id(&caller.id).await?.map(Into::into);
        Ok(CommentView::new(comment, author, vec![]))
    }

    /// Replace a comment's content. Only its author or an admin may do so.
    pub async fn edit(
        &self,
        caller: &Caller,
        blog_id: &str,
        comment_id: &str,
        input: EditCommentInput,
    ) -> AppResult<CommentView> {
        let existing = self.find_on_blog(blog_id, comment_id).await?;
        if !caller.can_modify(&existing.author_id) {
            return Err(AppError::Forbidden(
                "Only the author or an admin may edit this comment".to_string(),
            ));
        }
        let content = validate_content(&input.content)?;

        let now = chrono::Utc::now();
        let mut model: comment::ActiveModel = existing.into();
        model.content = Set(content);
        model.is_edited = Set(true);
        model.edited_at = Set(Some(now.into()));
        model.updated_at = Set(Some(now.into()));

        let comment = self.comment_repo.update(model).await?;
        tracing::debug!(comment_id = %comment.id, "Edited comment");

        self.threads(vec![comment])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("Lost edited comment {comment_id}")))
    }

    /// Delete a comment and all of its replies. Only its author or an admin
    /// may do so.
    ///
    /// Returns the number of comments removed.
    pub async fn delete(
        &self,
        caller: &Caller,
        blog_id: &str,
        comment_id: &str,
    ) -> AppResult<u64> {
        let existing = self.find_on_blog(blog_id, comment_id).await?;
        if !caller.can_modify(&existing.author_id) {
            return Err(AppError::Forbidden(
                "Only the author or an admin may delete this comment".to_string(),
            ));
        }

        let removed = self.comment_repo.delete_cascade(&existing).await?;
        get_metrics()
            .comments_deleted
            .fetch_add(removed, Ordering::Relaxed);
        tracing::info!(
            comment_id = %comment_id,
            blog_id = %blog_id,
            removed,
            deleted_by = %caller.id,
            "Deleted comment thread"
        );

        Ok(removed)
    }

    /// Like or unlike a comment.
    pub async fn toggle_like(
        &self,
        caller: &Caller,
        blog_id: &str,
        comment_id: &str,
    ) -> AppResult<CommentLikeState> {
        self.find_on_blog(blog_id, comment_id).await?;

        let (liked, like_count) = self.comment_repo.toggle_like(comment_id, &caller.id).await?;
        get_metrics().likes_toggled.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            comment_id = %comment_id,
            user_id = %caller.id,
            liked,
            "Toggled comment like"
        );

        Ok(CommentLikeState { liked, like_count })
    }

    /// A comment is only reachable through a post that still exists.
    async fn find_on_blog(&self, blog_id: &str, comment_id: &str) -> AppResult<comment::Model> {
        self.blog_repo.get_by_id(blog_id).await?;
        self.comment_repo
            .find_by_id(comment_id)
            .await?
            .filter(|c| c.blog_id == blog_id)
            .ok_or_else(|| AppError::NotFound(format!("Comment: {comment_id}")))
    }

    /// Resolve replies, likes and authors for a set of comments.
    async fn threads(&self, comments: Vec<comment::Model>) -> AppResult<Vec<CommentView>> {
        if comments.is_empty() {
            return Ok(vec![]);
        }

        let parent_ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
        let replies = self.comment_repo.find_replies(&parent_ids).await?;

        let all_ids: Vec<String> = comments
            .iter()
            .chain(&replies)
            .map(|c| c.id.clone())
            .collect();
        let mut likes: HashMap<String, Vec<String>> = HashMap::new();
        for like in self.comment_repo.find_likes(&all_ids).await? {
            likes.entry(like.comment_id).or_default().push(like.user_id);
        }

        let mut seen = HashSet::new();
        let author_ids: Vec<String> = comments
            .iter()
            .chain(&replies)
            .filter(|c| seen.insert(c.author_id.as_str()))
            .map(|c| c.author_id.clone())
            .collect();
        let authors: HashMap<String, AuthorRef> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u.into()))
            .collect();

        let mut view = |c: comment::Model| {
            let author = authors.get(&c.author_id).cloned();
            let liked_by = likes.remove(&c.id).unwrap_or_default();
            CommentView::new(c, author, liked_by)
        };

        let mut replies_by_parent: HashMap<String, Vec<CommentView>> = HashMap::new();
        for reply in replies {
            if let Some(parent_id) = reply.parent_id.clone() {
                replies_by_parent
                    .entry(parent_id)
                    .or_default()
                    .push(view(reply));
            }
        }

        Ok(comments
            .into_iter()
            .map(|c| {
                let thread = replies_by_parent.remove(&c.id).unwrap_or_default();
                let mut top = view(c);
                top.replies = thread;
                top
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::identity::Role;
    use chrono::{Duration, Utc};
    use inkpost_db::entities::{
        blog::{self, BlogStatus},
        comment_like,
        user::{self, UserRole},
    };
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
    use std::sync::Arc;

    fn create_test_blog(id: &str) -> blog::Model {
        blog::Model {
            id: id.to_string(),
            title: "Post".to_string(),
            content: "Body".to_string(),
            excerpt: "Body...".to_string(),
            meta_description: "Body...".to_string(),
            slug: "post".to_string(),
            read_time_minutes: 1,
            author_id: "owner".to_string(),
            category_id: "c1".to_string(),
            image_url: None,
            status: BlogStatus::Published,
            views: 0,
            like_count: 0,
            comment_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_comment(
        id: &str,
        blog_id: &str,
        author_id: &str,
        parent_id: Option<&str>,
    ) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            blog_id: blog_id.to_string(),
            author_id: author_id.to_string(),
            parent_id: parent_id.map(str::to_string),
            content: "Hello".to_string(),
            is_edited: false,
            edited_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_user(id: &str, name: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: name.to_string(),
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

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
        btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn service(db: Arc<DatabaseConnection>) -> CommentService {
        CommentService::new(
            CommentRepository::new(db.clone()),
            BlogRepository::new(db.clone()),
            UserRepository::new(db),
        )
    }

    fn user_a() -> Caller {
        Caller::new("userA", Role::User)
    }

    fn user_b() -> Caller {
        Caller::new("userB", Role::User)
    }

    #[test]
    fn test_content_boundary() {
        assert!(validate_content(&"x".repeat(MAX_COMMENT_CHARS)).is_ok());
        assert!(matches!(
            validate_content(&"x".repeat(MAX_COMMENT_CHARS + 1)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_content(" \n\t "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_content_is_trimmed_and_counted_in_chars() {
        assert_eq!(validate_content("  hi  ").unwrap(), "hi");
        // Multi-byte characters count once each
        assert!(validate_content(&"ü".repeat(MAX_COMMENT_CHARS)).is_ok());
        // Surrounding whitespace does not count towards the limit
        let padded = format!("  {}  ", "x".repeat(MAX_COMMENT_CHARS));
        assert!(validate_content(&padded).is_ok());
    }

    #[test]
    fn test_validation_message_does_not_echo_content() {
        let body = "secret ".repeat(200);
        match validate_content(&body) {
            Err(AppError::Validation(msg)) => assert!(!msg.contains("secret")),
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_pagination_remainder_page() {
        // 23 top-level comments, 10 per page
        let last = CommentPagination::new(PageRequest::new(Some(3), Some(10), 10, 50), 23);
        assert_eq!(last.total_pages, 3);
        assert!(!last.has_next_page);
        assert!(last.has_prev_page);

        let first = CommentPagination::new(PageRequest::new(Some(1), Some(10), 10, 50), 23);
        assert!(first.has_next_page);
        assert!(!first.has_prev_page);
    }

    #[tokio::test]
    async fn test_list_missing_blog_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<blog::Model>::new()])
                .into_connection(),
        );

        let result = service(db).list("nope", None, None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_nests_replies_under_parents() {
        let c1 = create_test_comment("c1", "p1", "userA", None);
        let c2 = create_test_comment("c2", "p1", "userB", None);
        let r1 = create_test_comment("r1", "p1", "userB", Some("c1"));
        let like = comment_like::Model {
            comment_id: "r1".to_string(),
            user_id: "userA".to_string(),
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[count_row(2)]])
                .append_query_results([[c1, c2]])
                .append_query_results([[r1]])
                .append_query_results([[like]])
                .append_query_results([[
                    create_test_user("userA", "Ann"),
                    create_test_user("userB", "Ben"),
                ]])
                .into_connection(),
        );

        let page = service(db).list("p1", None, None).await.unwrap();

        assert_eq!(page.comments.len(), 2);
        let first = &page.comments[0];
        assert_eq!(first.id, "c1");
        assert_eq!(first.author.as_ref().unwrap().name, "Ann");
        assert_eq!(first.replies.len(), 1);
        assert_eq!(first.replies[0].id, "r1");
        assert_eq!(first.replies[0].likes, vec!["userA"]);
        assert_eq!(first.replies[0].like_count, 1);
        assert!(page.comments[1].replies.is_empty());

        assert_eq!(page.pagination.total_comments, 2);
        assert_eq!(page.pagination.total_pages, 1);
        assert!(!page.pagination.has_next_page);
    }

    #[tokio::test]
    async fn test_post_rejects_blank_before_touching_storage() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let input = PostCommentInput {
            content: "   ".to_string(),
            parent_comment_id: None,
        };

        let result = service(db.clone()).post(&user_a(), "p1", input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_post_reply_to_missing_parent() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let input = PostCommentInput {
            content: "Reply".to_string(),
            parent_comment_id: Some("gone".to_string()),
        };

        match service(db).post(&user_b(), "p1", input).await {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "reply target missing"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_post_reply_to_parent_on_other_blog() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[create_test_comment("c9", "p2", "userA", None)]])
                .into_connection(),
        );

        let input = PostCommentInput {
            content: "Reply".to_string(),
            parent_comment_id: Some("c9".to_string()),
        };

        let result = service(db).post(&user_b(), "p1", input).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_post_reply_to_reply_is_rejected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[create_test_comment("r1", "p1", "userB", Some("c1"))]])
                .into_connection(),
        );

        let input = PostCommentInput {
            content: "Deeper".to_string(),
            parent_comment_id: Some("r1".to_string()),
        };

        match service(db).post(&user_a(), "p1", input).await {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "replies cannot be nested"),
            _ => panic!("Expected Validation error"),
        }
    }

    #[tokio::test]
    async fn test_post_bumps_comment_count_in_transaction() {
        let created = create_test_comment("c1", "p1", "userA", None);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[created]])
                .append_exec_results([exec(1)])
                .append_query_results([[create_test_user("userA", "Ann")]])
                .into_connection(),
        );

        let svc = service(db.clone());
        let view = svc
            .post(
                &user_a(),
                "p1",
                PostCommentInput {
                    content: "  Hello  ".to_string(),
                    parent_comment_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(view.author.unwrap().name, "Ann");
        assert!(view.replies.is_empty());
        drop(svc);

        let log = format!("{:?}", Arc::try_unwrap(db).unwrap().into_transaction_log());
        assert!(log.contains("\"comment_count\" + "));
        assert!(log.contains("\"Hello\""));
    }

    #[tokio::test]
    async fn test_edit_by_other_user_is_forbidden() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[create_test_comment("c1", "p1", "userA", None)]])
                .into_connection(),
        );

        let user_c = Caller::new("userC", Role::User);
        let result = service(db)
            .edit(
                &user_c,
                "p1",
                "c1",
                EditCommentInput {
                    content: "Hijacked".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_edit_by_admin_marks_edited() {
        let mut edited = create_test_comment("c1", "p1", "userA", None);
        edited.content = "Fixed".to_string();
        edited.is_edited = true;
        edited.edited_at = Some(Utc::now().into());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[create_test_comment("c1", "p1", "userA", None)]])
                .append_query_results([[edited]])
                .append_query_results([Vec::<comment::Model>::new()])
                .append_query_results([Vec::<comment_like::Model>::new()])
                .append_query_results([[create_test_user("userA", "Ann")]])
                .into_connection(),
        );

        let admin = Caller::new("root", Role::Admin);
        let view = service(db)
            .edit(
                &admin,
                "p1",
                "c1",
                EditCommentInput {
                    content: " Fixed ".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(view.is_edited);
        assert!(view.edited_at.is_some());
        assert_eq!(view.content, "Fixed");
    }

    #[tokio::test]
    async fn test_edit_over_limit_is_rejected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[create_test_comment("c1", "p1", "userA", None)]])
                .into_connection(),
        );

        let result = service(db)
            .edit(
                &user_a(),
                "p1",
                "c1",
                EditCommentInput {
                    content: "x".repeat(MAX_COMMENT_CHARS + 1),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_comment_on_other_blog_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[create_test_comment("c1", "p2", "userA", None)]])
                .into_connection(),
        );

        let result = service(db).delete(&user_a(), "p1", "c1").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_comment_on_deleted_blog_is_inaccessible() {
        // The comment row outlived its post, e.g. after a failed purge
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<blog::Model>::new()])
                .append_query_results([Vec::<blog::Model>::new()])
                .append_query_results([Vec::<blog::Model>::new()])
                .into_connection(),
        );
        let svc = service(db.clone());

        let liked = svc.toggle_like(&user_b(), "p1", "c1").await;
        assert!(matches!(liked, Err(AppError::NotFound(_))));

        let edited = svc
            .edit(
                &user_a(),
                "p1",
                "c1",
                EditCommentInput {
                    content: "Still here".to_string(),
                },
            )
            .await;
        assert!(matches!(edited, Err(AppError::NotFound(_))));

        let deleted = svc.delete(&user_a(), "p1", "c1").await;
        assert!(matches!(deleted, Err(AppError::NotFound(_))));
        drop(svc);

        // Only the three post lookups ran; no comment was read or written
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_replies() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[create_test_comment("c1", "p1", "userA", None)]])
                .append_exec_results([exec(3), exec(1)])
                .into_connection(),
        );

        let svc = service(db.clone());
        let removed = svc.delete(&user_a(), "p1", "c1").await.unwrap();
        assert_eq!(removed, 3);
        drop(svc);

        let log = format!("{:?}", Arc::try_unwrap(db).unwrap().into_transaction_log());
        assert!(log.contains("\"parent_id\" = $"));
        assert!(log.contains("GREATEST(comment_count - 3, 0)"));
    }

    #[tokio::test]
    async fn test_toggle_like_twice_restores_state() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // first toggle: nothing to delete, insert, count
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[create_test_comment("c1", "p1", "userA", None)]])
                .append_exec_results([exec(0), exec(1)])
                .append_query_results([[count_row(1)]])
                // second toggle: delete, count
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[create_test_comment("c1", "p1", "userA", None)]])
                .append_exec_results([exec(1)])
                .append_query_results([[count_row(0)]])
                .into_connection(),
        );

        let svc = service(db);
        let first = svc.toggle_like(&user_b(), "p1", "c1").await.unwrap();
        assert_eq!(
            first,
            CommentLikeState {
                liked: true,
                like_count: 1
            }
        );

        let second = svc.toggle_like(&user_b(), "p1", "c1").await.unwrap();
        assert_eq!(
            second,
            CommentLikeState {
                liked: false,
                like_count: 0
            }
        );
    }

    #[tokio::test]
    async fn test_thread_lifecycle() {
        let c1 = create_test_comment("c1", "p1", "userA", None);
        let mut r1 = create_test_comment("r1", "p1", "userB", Some("c1"));
        r1.content = "Reply".to_string();
        r1.created_at = (Utc::now() + Duration::seconds(1)).into();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // PostComment(P, userA, "Hello")
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[c1.clone()]])
                .append_exec_results([exec(1)])
                .append_query_results([[create_test_user("userA", "Ann")]])
                // PostComment(P, userB, "Reply", parent = C1)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[c1.clone()]])
                .append_query_results([[r1.clone()]])
                .append_exec_results([exec(1)])
                .append_query_results([[create_test_user("userB", "Ben")]])
                // ListComments(P)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[count_row(1)]])
                .append_query_results([[c1.clone()]])
                .append_query_results([[r1.clone()]])
                .append_query_results([Vec::<comment_like::Model>::new()])
                .append_query_results([[
                    create_test_user("userA", "Ann"),
                    create_test_user("userB", "Ben"),
                ]])
                // DeleteComment(C1) by userA
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[c1.clone()]])
                .append_exec_results([exec(2), exec(1)])
                // ListComments(P)
                .append_query_results([[create_test_blog("p1")]])
                .append_query_results([[count_row(0)]])
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );
        let svc = service(db);

        let top = svc
            .post(
                &user_a(),
                "p1",
                PostCommentInput {
                    content: "Hello".to_string(),
                    parent_comment_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(top.id, "c1");

        let reply = svc
            .post(
                &user_b(),
                "p1",
                PostCommentInput {
                    content: "Reply".to_string(),
                    parent_comment_id: Some("c1".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(reply.parent_comment_id.as_deref(), Some("c1"));

        let page = svc.list("p1", None, None).await.unwrap();
        assert_eq!(page.comments.len(), 1);
        assert_eq!(page.comments[0].id, "c1");
        let reply_ids: Vec<_> = page.comments[0].replies.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(reply_ids, vec!["r1"]);

        assert_eq!(svc.delete(&user_a(), "p1", "c1").await.unwrap(), 2);

        let page = svc.list("p1", None, None).await.unwrap();
        assert!(page.comments.is_empty());
        assert_eq!(page.pagination.total_comments, 0);
    }
}
