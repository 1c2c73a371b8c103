//! Blog post endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use inkpost_common::{AppError, AppResult};
use inkpost_core::{
    BlogLikeState, BlogQuery, BlogSort, BlogSummary, BlogView, CreateBlogInput, Pagination,
    SortOrder, UpdateBlogInput,
};
use inkpost_db::entities::blog::BlogStatus;
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::comments,
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, no_content},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_blogs).post(create_blog))
        .route("/my-posts", get(my_posts))
        .route("/{id}", get(get_blog).put(update_blog).delete(delete_blog))
        .route("/{id}/like", post(toggle_like))
        .route("/{id}/similar", get(similar))
        .nest("/{id}/comments", comments::router())
}

/// Listing query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBlogsParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Category slug
    pub category: Option<String>,
    /// Author id
    pub author: Option<String>,
    /// `draft`, `published`, `archived` or `all`; published when absent
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<BlogSort>,
    pub order: Option<SortOrder>,
}

impl TryFrom<ListBlogsParams> for BlogQuery {
    type Error = AppError;

    fn try_from(params: ListBlogsParams) -> Result<Self, Self::Error> {
        let status = match params.status.as_deref().map(str::trim) {
            None | Some("" | "published") => Some(BlogStatus::Published),
            Some("all") => None,
            Some("draft") => Some(BlogStatus::Draft),
            Some("archived") => Some(BlogStatus::Archived),
            Some(other) => {
                return Err(AppError::BadRequest(format!("Unknown status filter: {other}")));
            }
        };

        Ok(Self {
            page: params.page,
            limit: params.limit,
            category: params.category,
            author_id: params.author,
            status,
            search: params.search,
            sort: params.sort.unwrap_or_default(),
            order: params.order.unwrap_or_default(),
        })
    }
}

/// A page of posts.
#[derive(Serialize)]
pub struct BlogListResponse {
    pub blogs: Vec<BlogSummary>,
    pub pagination: Pagination,
}

async fn list_blogs(
    State(state): State<AppState>,
    Query(params): Query<ListBlogsParams>,
) -> AppResult<ApiResponse<BlogListResponse>> {
    let page = state.blog_service.list(params.try_into()?).await?;
    Ok(ApiResponse::ok(BlogListResponse {
        blogs: page.items,
        pagination: page.pagination,
    }))
}

async fn create_blog(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateBlogInput>,
) -> AppResult<ApiResponse<BlogView>> {
    let blog = state.blog_service.create(&caller, req).await?;
    Ok(ApiResponse::created(blog))
}

/// The caller's own posts in every status.
async fn my_posts(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<BlogSummary>>> {
    Ok(ApiResponse::ok(state.blog_service.my_posts(&caller).await?))
}

/// Read a post. Every read counts as a view.
async fn get_blog(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<BlogView>> {
    let blog = state.blog_service.get(&id, caller.as_ref()).await?;
    Ok(ApiResponse::ok(blog))
}

async fn update_blog(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBlogInput>,
) -> AppResult<ApiResponse<BlogView>> {
    let blog = state.blog_service.update(&caller, &id, req).await?;
    Ok(ApiResponse::ok(blog))
}

async fn delete_blog(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.blog_service.delete(&caller, &id).await?;
    Ok(no_content())
}

async fn toggle_like(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<BlogLikeState>> {
    let like = state.blog_service.toggle_like(&caller, &id).await?;
    Ok(ApiResponse::ok(like))
}

async fn similar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<BlogSummary>>> {
    Ok(ApiResponse::ok(state.blog_service.similar(&id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_defaults_to_published() {
        let query = BlogQuery::try_from(ListBlogsParams::default());
        assert!(matches!(query, Ok(q) if q.status == Some(BlogStatus::Published)));
    }

    #[test]
    fn test_status_filter_all_lists_everything() {
        let params = ListBlogsParams {
            status: Some("all".to_string()),
            ..Default::default()
        };
        assert!(matches!(BlogQuery::try_from(params), Ok(q) if q.status.is_none()));
    }

    #[test]
    fn test_unknown_status_filter_is_rejected() {
        let params = ListBlogsParams {
            status: Some("deleted".to_string()),
            ..Default::default()
        };
        assert!(matches!(BlogQuery::try_from(params), Err(AppError::BadRequest(_))));
    }
}
