//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use inkpost_common::AppResult;
use inkpost_core::{AuthSession, LoginInput, RegisterInput, UserView};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

/// Create an account and return its first session.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterInput>,
) -> AppResult<ApiResponse<AuthSession>> {
    let session = state.auth_service.register(req).await?;
    Ok(ApiResponse::created(session))
}

/// Sign in. Issues a fresh bearer token.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginInput>,
) -> AppResult<ApiResponse<AuthSession>> {
    let session = state.auth_service.login(req).await?;
    Ok(ApiResponse::ok(session))
}

async fn me(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserView>> {
    Ok(ApiResponse::ok(state.auth_service.me(&caller).await?))
}
