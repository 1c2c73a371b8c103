//! Search endpoint.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use inkpost_common::AppResult;
use inkpost_core::BlogSummary;
use serde::Deserialize;

use crate::{middleware::AppState, response::ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(search))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// Search posts by title and content. A missing or blank `q` finds nothing.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<ApiResponse<Vec<BlogSummary>>> {
    Ok(ApiResponse::ok(state.search_service.search(&params.q).await?))
}
