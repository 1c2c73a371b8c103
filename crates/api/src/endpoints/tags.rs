//! Tag endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use inkpost_common::AppResult;
use inkpost_core::{CreateTagInput, TagQuery, TagView, UpdateTagInput};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/{id}", get(get_tag).put(update_tag).delete(delete_tag))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTagsParams {
    #[serde(default)]
    pub active: bool,
    /// Case-insensitive substring of the name
    pub search: Option<String>,
    pub limit: Option<u64>,
}

async fn list_tags(
    State(state): State<AppState>,
    Query(params): Query<ListTagsParams>,
) -> AppResult<ApiResponse<Vec<TagView>>> {
    let tags = state
        .tag_service
        .list(TagQuery {
            active_only: params.active,
            search: params.search,
            limit: params.limit,
        })
        .await?;
    Ok(ApiResponse::ok(tags))
}

async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<TagView>> {
    Ok(ApiResponse::ok(state.tag_service.get(&id).await?))
}

async fn create_tag(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateTagInput>,
) -> AppResult<ApiResponse<TagView>> {
    let tag = state.tag_service.create(&caller, req).await?;
    Ok(ApiResponse::created(tag))
}

async fn update_tag(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTagInput>,
) -> AppResult<ApiResponse<TagView>> {
    let tag = state.tag_service.update(&caller, &id, req).await?;
    Ok(ApiResponse::ok(tag))
}

async fn delete_tag(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.tag_service.delete(&caller, &id).await?;
    Ok(no_content())
}
