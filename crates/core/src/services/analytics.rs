//! Engagement analytics.
//!
//! Read-only rollups over posts, users and comments. Windows are trailing
//! periods ending now; days are bucketed in UTC.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use inkpost_common::AppResult;
use inkpost_db::repositories::{
    AnalyticsRepository, CategoryRepository, CommentRepository, DailyBlogRow, DailyCountRow,
    DailySeries, RankedTermRow, TagRepository, TopAuthorRow, TopBlogRow, UserRepository,
};
use serde::Serialize;

const TOP_N: u64 = 10;

/// Weight of a single view in the engagement score.
pub const VIEW_WEIGHT: f64 = 0.1;

/// Trailing time window for analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Period {
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
}

impl Period {
    /// Parse `7d`, `30d`, `90d` or `1y`. Anything else is a week.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "30d" => Self::Month,
            "90d" => Self::Quarter,
            "1y" => Self::Year,
            _ => Self::Week,
        }
    }

    #[must_use]
    pub const fn days(self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    /// Start of the window ending at `now`.
    #[must_use]
    pub fn since(self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        (now - Duration::days(self.days())).into()
    }
}

/// Which rollup to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportType {
    #[default]
    Overview,
    Blogs,
    Users,
    Engagement,
}

impl ReportType {
    /// Parse `overview`, `blogs`, `users` or `engagement`. Anything else is
    /// an overview.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "blogs" => Self::Blogs,
            "users" => Self::Users,
            "engagement" => Self::Engagement,
            _ => Self::Overview,
        }
    }
}

/// Mean of `sum` over `count`, rounded to two decimals. Zero when `count` is zero.
#[must_use]
pub fn safe_avg(sum: f64, count: i64) -> f64 {
    if count <= 0 {
        return 0.0;
    }
    round2(sum / count as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Engagement score of a post: likes + comments + 0.1 x views.
#[must_use]
pub fn engagement_score(likes: i64, comments: i64, views: i64) -> f64 {
    likes as f64 + comments as f64 + VIEW_WEIGHT * views as f64
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OverviewTotals {
    pub posts: u64,
    pub users: u64,
    pub categories: u64,
    pub tags: u64,
    pub comments: u64,
    pub views: i64,
    pub likes: i64,
}

/// Rows created inside the window.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecentCounts {
    pub posts: u64,
    pub users: u64,
    pub comments: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPostStats {
    pub date: String,
    pub posts: i64,
    pub views: i64,
    pub likes: i64,
}

impl From<DailyBlogRow> for DailyPostStats {
    fn from(r: DailyBlogRow) -> Self {
        Self {
            date: r.date,
            posts: r.posts,
            views: r.views,
            likes: r.likes,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

impl From<DailyCountRow> for DailyCount {
    fn from(r: DailyCountRow) -> Self {
        Self {
            date: r.date,
            count: r.count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewReport {
    pub period: Period,
    pub totals: OverviewTotals,
    pub recent: RecentCounts,
    pub daily: Vec<DailyPostStats>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogAggregate {
    pub count: i64,
    pub avg_views: f64,
    pub avg_likes: f64,
    pub avg_comments: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopBlog {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub created_at: DateTime<FixedOffset>,
    pub author_name: Option<String>,
    pub category_name: Option<String>,
}

impl From<TopBlogRow> for TopBlog {
    fn from(r: TopBlogRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            slug: r.slug,
            views: r.views,
            likes: r.likes,
            comments: r.comments,
            created_at: r.created_at,
            author_name: r.author_name,
            category_name: r.category_name,
        }
    }
}

/// A category or tag with its post count.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RankedTerm {
    pub id: String,
    pub name: String,
    pub color: String,
    pub posts: i64,
}

impl From<RankedTermRow> for RankedTerm {
    fn from(r: RankedTermRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            color: r.color,
            posts: r.posts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogReport {
    pub period: Period,
    pub summary: BlogAggregate,
    pub top_by_views: Vec<TopBlog>,
    pub top_categories: Vec<RankedTerm>,
    pub top_tags: Vec<RankedTerm>,
    pub daily_posts: Vec<DailyCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserAggregate {
    pub count: i64,
    pub verified_count: i64,
    pub active_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TopAuthor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub posts: i64,
    pub views: i64,
    pub likes: i64,
}

impl From<TopAuthorRow> for TopAuthor {
    fn from(r: TopAuthorRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
            posts: r.posts,
            views: r.views,
            likes: r.likes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReport {
    pub period: Period,
    pub summary: UserAggregate,
    pub top_authors: Vec<TopAuthor>,
    pub daily_new_users: Vec<DailyCount>,
    pub daily_active_users: Vec<DailyCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngagementReport {
    pub period: Period,
    pub posts: i64,
    pub avg_engagement_score: f64,
    pub total_engagement_score: f64,
    pub total_comments: i64,
    pub total_likes: i64,
    pub total_views: i64,
}

/// A computed report, tagged with its type.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnalyticsReport {
    Overview(OverviewReport),
    Blogs(BlogReport),
    Users(UserReport),
    Engagement(EngagementReport),
}

/// Service computing analytics rollups.
#[derive(Clone)]
pub struct AnalyticsService {
    analytics_repo: AnalyticsRepository,
    user_repo: UserRepository,
    category_repo: CategoryRepository,
    tag_repo: TagRepository,
    comment_repo: CommentRepository,
}

impl AnalyticsService {
    /// Create a new analytics service.
    #[must_use]
    pub const fn new(
        analytics_repo: AnalyticsRepository,
        user_repo: UserRepository,
        category_repo: CategoryRepository,
        tag_repo: TagRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            analytics_repo,
            user_repo,
            category_repo,
            tag_repo,
            comment_repo,
        }
    }

    /// Compute the requested report for a trailing period ending now.
    pub async fn report(&self, period: Period, report: ReportType) -> AppResult<AnalyticsReport> {
        let since = period.since(Utc::now());
        tracing::debug!(?period, ?report, %since, "Computing analytics");

        Ok(match report {
            ReportType::Overview => AnalyticsReport::Overview(self.overview(period, since).await?),
            ReportType::Blogs => AnalyticsReport::Blogs(self.blogs(period, since).await?),
            ReportType::Users => AnalyticsReport::Users(self.users(period, since).await?),
            ReportType::Engagement => {
                AnalyticsReport::Engagement(self.engagement(period, since).await?)
            }
        })
    }

    /// All-time totals, counts inside the window, and per-day post stats.
    pub async fn overview(
        &self,
        period: Period,
        since: DateTime<FixedOffset>,
    ) -> AppResult<OverviewReport> {
        let all_time = self.analytics_repo.blog_totals(None).await?;

        let totals = OverviewTotals {
            posts: u64::try_from(all_time.posts).unwrap_or_default(),
            users: self.user_repo.count().await?,
            categories: self.category_repo.count().await?,
            tags: self.tag_repo.count().await?,
            comments: self.comment_repo.count().await?,
            views: all_time.views,
            likes: all_time.likes,
        };

        let recent = RecentCounts {
            posts: self.analytics_repo.count_blogs_since(since).await?,
            users: self.analytics_repo.count_users_since(since).await?,
            comments: self.analytics_repo.count_comments_since(since).await?,
        };

        let daily = self
            .analytics_repo
            .daily_blog_stats(since)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(OverviewReport {
            period,
            totals,
            recent,
            daily,
        })
    }

    /// Averages for posts in the window, all-time top posts, top categories
    /// and tags in the window, and new posts per day.
    pub async fn blogs(
        &self,
        period: Period,
        since: DateTime<FixedOffset>,
    ) -> AppResult<BlogReport> {
        let totals = self.analytics_repo.blog_totals(Some(since)).await?;

        let summary = BlogAggregate {
            count: totals.posts,
            avg_views: safe_avg(totals.views as f64, totals.posts),
            avg_likes: safe_avg(totals.likes as f64, totals.posts),
            avg_comments: safe_avg(totals.comments as f64, totals.posts),
        };

        let top_by_views = self.analytics_repo.top_blogs_by_views(TOP_N).await?;
        let top_categories = self.analytics_repo.top_categories(since, TOP_N).await?;
        let top_tags = self.analytics_repo.top_tags(since, TOP_N).await?;
        let daily_posts = self
            .analytics_repo
            .daily_counts(DailySeries::PostsCreated, since)
            .await?;

        Ok(BlogReport {
            period,
            summary,
            top_by_views: top_by_views.into_iter().map(Into::into).collect(),
            top_categories: top_categories.into_iter().map(Into::into).collect(),
            top_tags: top_tags.into_iter().map(Into::into).collect(),
            daily_posts: daily_posts.into_iter().map(Into::into).collect(),
        })
    }

    /// Registrations in the window, all-time top authors, and daily new and
    /// active users.
    pub async fn users(
        &self,
        period: Period,
        since: DateTime<FixedOffset>,
    ) -> AppResult<UserReport> {
        let totals = self.analytics_repo.user_totals(since).await?;
        let top_authors = self.analytics_repo.top_authors(TOP_N).await?;
        let new_users = self
            .analytics_repo
            .daily_counts(DailySeries::UsersCreated, since)
            .await?;
        let active_users = self
            .analytics_repo
            .daily_counts(DailySeries::UsersActive, since)
            .await?;

        Ok(UserReport {
            period,
            summary: UserAggregate {
                count: totals.users,
                verified_count: totals.verified,
                active_count: totals.active,
            },
            top_authors: top_authors.into_iter().map(Into::into).collect(),
            daily_new_users: new_users.into_iter().map(Into::into).collect(),
            daily_active_users: active_users.into_iter().map(Into::into).collect(),
        })
    }

    /// Engagement scores of posts created in the window.
    ///
    /// The score is linear, so the window's total is the score of its sums.
    pub async fn engagement(
        &self,
        period: Period,
        since: DateTime<FixedOffset>,
    ) -> AppResult<EngagementReport> {
        let totals = self.analytics_repo.blog_totals(Some(since)).await?;
        let total_score = engagement_score(totals.likes, totals.comments, totals.views);

        Ok(EngagementReport {
            period,
            posts: totals.posts,
            avg_engagement_score: safe_avg(total_score, totals.posts),
            total_engagement_score: round2(total_score),
            total_comments: totals.comments,
            total_likes: totals.likes,
            total_views: totals.views,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use inkpost_db::repositories::BlogTotalsRow;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn service(db: Arc<DatabaseConnection>) -> AnalyticsService {
        AnalyticsService::new(
            AnalyticsRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            CategoryRepository::new(db.clone()),
            TagRepository::new(db.clone()),
            CommentRepository::new(db),
        )
    }

    fn totals_row(
        posts: i64,
        views: i64,
        likes: i64,
        comments: i64,
    ) -> BTreeMap<&'static str, Value> {
        btreemap! {
            "posts" => Value::BigInt(Some(posts)),
            "views" => Value::BigInt(Some(views)),
            "likes" => Value::BigInt(Some(likes)),
            "comments" => Value::BigInt(Some(comments)),
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    fn no_rows() -> Vec<BTreeMap<&'static str, Value>> {
        vec![]
    }

    #[test]
    fn test_period_parse() {
        assert_eq!(Period::parse("7d"), Period::Week);
        assert_eq!(Period::parse("30d"), Period::Month);
        assert_eq!(Period::parse("90d"), Period::Quarter);
        assert_eq!(Period::parse("1y"), Period::Year);
        assert_eq!(Period::parse("2w"), Period::Week);
        assert_eq!(Period::parse(""), Period::Week);
        assert_eq!(Period::Year.days(), 365);
    }

    #[test]
    fn test_period_serializes_as_short_form() {
        assert_eq!(serde_json::to_string(&Period::Quarter).unwrap(), "\"90d\"");
    }

    #[test]
    fn test_report_type_parse() {
        assert_eq!(ReportType::parse("blogs"), ReportType::Blogs);
        assert_eq!(ReportType::parse("users"), ReportType::Users);
        assert_eq!(ReportType::parse("engagement"), ReportType::Engagement);
        assert_eq!(ReportType::parse("revenue"), ReportType::Overview);
    }

    #[test]
    fn test_safe_avg() {
        assert_eq!(safe_avg(10.0, 0), 0.0);
        assert_eq!(safe_avg(0.0, 0), 0.0);
        assert_eq!(safe_avg(10.0, 4), 2.5);
        assert_eq!(safe_avg(10.0, 3), 3.33);
        assert!(!safe_avg(1.0, 0).is_nan());
    }

    #[test]
    fn test_engagement_score() {
        assert_eq!(engagement_score(0, 0, 0), 0.0);
        assert!((engagement_score(3, 2, 50) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_since_is_period_days_back() {
        let now = Utc::now();
        let since = Period::Month.since(now);
        assert_eq!((now - since.with_timezone(&Utc)).num_days(), 30);
    }

    #[tokio::test]
    async fn test_engagement_on_empty_dataset_is_zero() {
        for period in [Period::Week, Period::Month, Period::Quarter, Period::Year] {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[totals_row(0, 0, 0, 0)]])
                    .into_connection(),
            );

            let report = service(db)
                .engagement(period, period.since(Utc::now()))
                .await
                .unwrap();
            assert_eq!(report.posts, 0);
            assert_eq!(report.avg_engagement_score, 0.0);
            assert_eq!(report.total_engagement_score, 0.0);
            assert_eq!(report.total_views, 0);
        }
    }

    #[tokio::test]
    async fn test_engagement_without_totals_row_is_zero() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([no_rows()])
                .into_connection(),
        );

        let report = service(db)
            .report(Period::Week, ReportType::Engagement)
            .await
            .unwrap();
        match report {
            AnalyticsReport::Engagement(r) => {
                assert_eq!(r.avg_engagement_score, 0.0);
                assert_eq!(r.total_likes, 0);
            }
            _ => panic!("Expected engagement report"),
        }
    }

    #[tokio::test]
    async fn test_engagement_averages() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[totals_row(2, 100, 4, 6)]])
                .into_connection(),
        );

        let report = service(db)
            .engagement(Period::Week, Period::Week.since(Utc::now()))
            .await
            .unwrap();
        // 4 + 6 + 0.1 * 100 = 20 over 2 posts
        assert_eq!(report.total_engagement_score, 20.0);
        assert_eq!(report.avg_engagement_score, 10.0);
    }

    #[tokio::test]
    async fn test_blog_report_on_empty_dataset() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[totals_row(0, 0, 0, 0)]])
                .append_query_results([no_rows(), no_rows(), no_rows(), no_rows()])
                .into_connection(),
        );

        let report = service(db)
            .blogs(Period::Month, Period::Month.since(Utc::now()))
            .await
            .unwrap();
        assert_eq!(
            report.summary,
            BlogAggregate {
                count: 0,
                avg_views: 0.0,
                avg_likes: 0.0,
                avg_comments: 0.0,
            }
        );
        assert!(report.top_by_views.is_empty());
        assert!(report.daily_posts.is_empty());
    }

    #[tokio::test]
    async fn test_overview_on_empty_dataset() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[totals_row(0, 0, 0, 0)]])
                .append_query_results([
                    [count_row(0)],
                    [count_row(0)],
                    [count_row(0)],
                    [count_row(0)],
                    [count_row(0)],
                    [count_row(0)],
                    [count_row(0)],
                ])
                .append_query_results([no_rows()])
                .into_connection(),
        );

        let report = service(db)
            .overview(Period::Week, Period::Week.since(Utc::now()))
            .await
            .unwrap();
        assert_eq!(report.totals.posts, 0);
        assert_eq!(report.totals.views, 0);
        assert_eq!(report.recent.comments, 0);
        assert!(report.daily.is_empty());
    }

    #[test]
    fn test_totals_row_default_is_zero() {
        let row = BlogTotalsRow::default();
        assert_eq!(row.posts, 0);
        assert_eq!(safe_avg(row.views as f64, row.posts), 0.0);
    }
}
