//! API endpoints.

mod admin;
mod auth;
mod blogs;
mod categories;
mod comments;
mod metrics;
mod search;
mod tags;

use axum::Router;

use crate::middleware::AppState;

pub use metrics::health_check;

/// Create the API router, to be nested under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/blogs", blogs::router())
        .nest("/categories", categories::router())
        .nest("/tags", tags::router())
        .nest("/search", search::router())
        .nest("/admin", admin::router())
        .nest("/metrics", metrics::router())
}
