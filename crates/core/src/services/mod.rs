//! Business logic services.

#![allow(missing_docs)]

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod blog;
pub mod category;
pub mod comment;
pub mod derived;
pub mod identity;
pub mod pagination;
pub mod reconcile;
pub mod search;
pub mod tag;

pub use admin::{AdminService, AdminStats, UserListQuery};
pub use analytics::{AnalyticsReport, AnalyticsService, Period, ReportType};
pub use auth::{AuthService, AuthSession, LoginInput, RegisterInput, UserView};
pub use blog::{
    BlogLikeState, BlogQuery, BlogService, BlogSort, BlogSummary, BlogView, CreateBlogInput,
    SortOrder, UpdateBlogInput,
};
pub use category::{CategoryService, CategoryView, CreateCategoryInput, UpdateCategoryInput};
pub use comment::{
    CommentLikeState, CommentPage, CommentService, CommentView, EditCommentInput,
    PostCommentInput,
};
pub use identity::{Caller, IdentityResolver, Role, SharedIdentityResolver, TokenIdentityResolver};
pub use pagination::{PageRequest, Paginated, Pagination};
pub use reconcile::{ReconcileReport, ReconcileService};
pub use search::SearchService;
pub use tag::{CreateTagInput, TagQuery, TagService, TagView, UpdateTagInput};
