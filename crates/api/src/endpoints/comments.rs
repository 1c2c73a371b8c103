//! Comment thread endpoints, nested under a post.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use inkpost_common::AppResult;
use inkpost_core::{CommentLikeState, CommentPage, CommentView, EditCommentInput, PostCommentInput};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments).post(post_comment))
        .route("/{comment_id}", put(edit_comment).delete(delete_comment))
        .route("/{comment_id}/like", post(toggle_like))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsParams {
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub page_size: Option<u64>,
}

/// How many comments a delete removed, replies included.
#[derive(Serialize)]
pub struct DeleteCommentResponse {
    pub deleted: u64,
}

/// Top-level comments, newest first, each with its replies oldest first.
async fn list_comments(
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
    Query(params): Query<ListCommentsParams>,
) -> AppResult<ApiResponse<CommentPage>> {
    let page = state
        .comment_service
        .list(&blog_id, params.page, params.page_size)
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn post_comment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
    Json(req): Json<PostCommentInput>,
) -> AppResult<ApiResponse<CommentView>> {
    let comment = state.comment_service.post(&caller, &blog_id, req).await?;
    Ok(ApiResponse::created(comment))
}

async fn edit_comment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path((blog_id, comment_id)): Path<(String, String)>,
    Json(req): Json<EditCommentInput>,
) -> AppResult<ApiResponse<CommentView>> {
    let comment = state
        .comment_service
        .edit(&caller, &blog_id, &comment_id, req)
        .await?;
    Ok(ApiResponse::ok(comment))
}

async fn delete_comment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path((blog_id, comment_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<DeleteCommentResponse>> {
    let deleted = state
        .comment_service
        .delete(&caller, &blog_id, &comment_id)
        .await?;
    Ok(ApiResponse::ok(DeleteCommentResponse { deleted }))
}

async fn toggle_like(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path((blog_id, comment_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<CommentLikeState>> {
    let like = state
        .comment_service
        .toggle_like(&caller, &blog_id, &comment_id)
        .await?;
    Ok(ApiResponse::ok(like))
}
