//! Admin endpoints.
//!
//! Every route requires the admin role.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
};
use inkpost_common::AppResult;
use inkpost_core::{
    AdminStats, AnalyticsReport, BlogSummary, Pagination, ReconcileReport, UserListQuery, UserView,
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AdminUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/blogs", get(list_blogs))
        .route("/blogs/{id}", delete(delete_blog))
        .route("/users", get(list_users))
        .route("/analytics", get(analytics))
        .route("/reconcile", post(reconcile))
}

/// A page of users.
#[derive(Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserView>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    /// `7d`, `30d`, `90d` or `1y`
    pub period: Option<String>,
    /// `overview`, `blogs`, `users` or `engagement`
    #[serde(rename = "type")]
    pub report_type: Option<String>,
}

async fn stats(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<AdminStats>> {
    Ok(ApiResponse::ok(state.admin_service.stats(&admin).await?))
}

async fn list_blogs(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<BlogSummary>>> {
    Ok(ApiResponse::ok(state.admin_service.list_blogs(&admin).await?))
}

async fn delete_blog(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.admin_service.delete_blog(&admin, &id).await?;
    Ok(no_content())
}

async fn list_users(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> AppResult<ApiResponse<UserListResponse>> {
    let page = state.admin_service.list_users(&admin, query).await?;
    Ok(ApiResponse::ok(UserListResponse {
        users: page.items,
        pagination: page.pagination,
    }))
}

async fn analytics(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> AppResult<ApiResponse<AnalyticsReport>> {
    let report = state
        .admin_service
        .analytics(
            &admin,
            params.period.as_deref(),
            params.report_type.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(report))
}

/// Run the consistency repair pass now.
async fn reconcile(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ReconcileReport>> {
    Ok(ApiResponse::ok(state.admin_service.reconcile(&admin).await?))
}
