//! Category endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use inkpost_common::AppResult;
use inkpost_core::{CategoryView, CreateCategoryInput, UpdateCategoryInput};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCategoriesParams {
    /// Only active categories
    #[serde(default)]
    pub active: bool,
    pub limit: Option<u64>,
}

/// Categories, most used first.
async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<ListCategoriesParams>,
) -> AppResult<ApiResponse<Vec<CategoryView>>> {
    let categories = state
        .category_service
        .list(params.active, params.limit)
        .await?;
    Ok(ApiResponse::ok(categories))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CategoryView>> {
    Ok(ApiResponse::ok(state.category_service.get(&id).await?))
}

async fn create_category(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryInput>,
) -> AppResult<ApiResponse<CategoryView>> {
    let category = state.category_service.create(&caller, req).await?;
    Ok(ApiResponse::created(category))
}

async fn update_category(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCategoryInput>,
) -> AppResult<ApiResponse<CategoryView>> {
    let category = state.category_service.update(&caller, &id, req).await?;
    Ok(ApiResponse::ok(category))
}

async fn delete_category(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.category_service.delete(&caller, &id).await?;
    Ok(no_content())
}
