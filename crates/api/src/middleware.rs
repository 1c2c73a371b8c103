//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use inkpost_common::{Timer, get_metrics};
use inkpost_core::{
    AdminService, AuthService, BlogService, CategoryService, CommentService, SearchService,
    SharedIdentityResolver, TagService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub blog_service: BlogService,
    pub comment_service: CommentService,
    pub category_service: CategoryService,
    pub tag_service: TagService,
    pub search_service: SearchService,
    pub admin_service: AdminService,
    pub identity: SharedIdentityResolver,
}

/// Authentication middleware.
///
/// Attaches the resolved [`inkpost_core::Caller`] to the request. Requests
/// without a valid credential pass through anonymously; handlers that need a
/// caller reject them. A resolver failure on the server side ends the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.identity.resolve_caller(token.trim()).await {
            Ok(Some(caller)) => {
                req.extensions_mut().insert(caller);
            }
            Ok(None) => tracing::debug!("Unknown bearer token"),
            Err(e) if e.is_server_error() => return e.into_response(),
            Err(e) => tracing::warn!(error = %e, "Failed to resolve caller"),
        }
    }

    next.run(req).await
}

/// Record status and latency of every request.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let timer = Timer::start();
    let response = next.run(req).await;
    get_metrics().record_http_request(response.status().as_u16(), timer.elapsed());
    response
}
