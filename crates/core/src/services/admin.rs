//! Admin dashboard operations.
//!
//! Every method checks the caller's role before touching storage.

use inkpost_common::AppResult;
use inkpost_db::{
    entities::user::UserRole,
    repositories::{AnalyticsRepository, CategoryRepository, UserListFilter, UserRepository},
};
use serde::{Deserialize, Serialize};

use super::analytics::{AnalyticsReport, AnalyticsService, Period, ReportType};
use super::auth::UserView;
use super::blog::{BlogService, BlogSummary};
use super::category::require_admin;
use super::identity::Caller;
use super::pagination::{PageRequest, Paginated, Pagination};
use super::reconcile::{ReconcileReport, ReconcileService};

const DEFAULT_USER_PAGE: u64 = 10;
const MAX_USER_PAGE: u64 = 50;

/// Site-wide totals for the dashboard header.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_blogs: i64,
    pub total_users: u64,
    pub total_categories: u64,
    pub total_views: i64,
}

/// Query parameters for the user listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive substring of name or email
    pub search: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Clone)]
pub struct AdminService {
    analytics_repo: AnalyticsRepository,
    user_repo: UserRepository,
    category_repo: CategoryRepository,
    blog_service: BlogService,
    analytics_service: AnalyticsService,
    reconcile_service: ReconcileService,
}

impl AdminService {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(
        analytics_repo: AnalyticsRepository,
        user_repo: UserRepository,
        category_repo: CategoryRepository,
        blog_service: BlogService,
        analytics_service: AnalyticsService,
        reconcile_service: ReconcileService,
    ) -> Self {
        Self {
            analytics_repo,
            user_repo,
            category_repo,
            blog_service,
            analytics_service,
            reconcile_service,
        }
    }

    pub async fn stats(&self, caller: &Caller) -> AppResult<AdminStats> {
        require_admin(caller)?;

        let blogs = self.analytics_repo.blog_totals(None).await?;
        let total_users = self.user_repo.count().await?;
        let total_categories = self.category_repo.count().await?;

        Ok(AdminStats {
            total_blogs: blogs.posts,
            total_users,
            total_categories,
            total_views: blogs.views,
        })
    }

    /// Every post regardless of status, newest first.
    pub async fn list_blogs(&self, caller: &Caller) -> AppResult<Vec<BlogSummary>> {
        require_admin(caller)?;
        self.blog_service.list_all().await
    }

    /// Page through users, newest first.
    pub async fn list_users(
        &self,
        caller: &Caller,
        query: UserListQuery,
    ) -> AppResult<Paginated<UserView>> {
        require_admin(caller)?;

        let request = PageRequest::new(query.page, query.limit, DEFAULT_USER_PAGE, MAX_USER_PAGE);
        let filter = UserListFilter {
            search: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            role: query.role,
        };

        let total = self.user_repo.count_filtered(&filter).await?;
        let users = self
            .user_repo
            .list(&filter, request.limit, request.offset())
            .await?;

        Ok(Paginated {
            items: users.into_iter().map(Into::into).collect(),
            pagination: Pagination::new(request, total),
        })
    }

    pub async fn delete_blog(&self, caller: &Caller, id: &str) -> AppResult<()> {
        require_admin(caller)?;
        self.blog_service.delete(caller, id).await
    }

    /// Compute an analytics report. Unknown period or type strings fall back
    /// to a week-long overview.
    pub async fn analytics(
        &self,
        caller: &Caller,
        period: Option<&str>,
        report: Option<&str>,
    ) -> AppResult<AnalyticsReport> {
        require_admin(caller)?;

        let period = period.map(Period::parse).unwrap_or_default();
        let report = report.map(ReportType::parse).unwrap_or_default();
        self.analytics_service.report(period, report).await
    }

    pub async fn reconcile(&self, caller: &Caller) -> AppResult<ReconcileReport> {
        require_admin(caller)?;
        tracing::info!(admin_id = %caller.id, "Manual reconciliation requested");
        self.reconcile_service.run().await
    }
}
