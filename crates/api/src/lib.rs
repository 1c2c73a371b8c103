//! HTTP API layer for inkpost.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: auth, posts with their comment threads, taxonomy, search, admin
//! - **Extractors**: caller identity from the bearer credential
//! - **Middleware**: authentication and request metrics
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use endpoints::{health_check, router};
pub use middleware::{AppState, auth_middleware, metrics_middleware};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the full application: `/api` routes, `/health` and the middleware stack.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
