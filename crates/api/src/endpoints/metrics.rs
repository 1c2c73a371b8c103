//! Metrics endpoints for monitoring.

use axum::{
    Json, Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use inkpost_common::metrics::{MetricsSnapshot, get_metrics};
use serde::Serialize;

use crate::middleware::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_metrics_json))
        .route("/prometheus", get(get_metrics_prometheus))
}

/// JSON metrics response.
#[derive(Serialize)]
pub struct MetricsResponse {
    pub http: HttpMetrics,
    pub content: ContentMetrics,
    pub consistency: ConsistencyMetrics,
    pub search: SearchMetrics,
}

#[derive(Serialize)]
pub struct HttpMetrics {
    pub requests_total: u64,
    pub requests_2xx: u64,
    pub requests_4xx: u64,
    pub requests_5xx: u64,
    pub latency_avg_us: u64,
}

#[derive(Serialize)]
pub struct ContentMetrics {
    pub blogs_created: u64,
    pub blogs_deleted: u64,
    pub comments_created: u64,
    pub comments_deleted: u64,
    pub likes_toggled: u64,
    pub users_registered: u64,
}

#[derive(Serialize)]
pub struct ConsistencyMetrics {
    pub counter_sync_failures: u64,
    pub reconcile_runs: u64,
    pub reconcile_rows_repaired: u64,
}

#[derive(Serialize)]
pub struct SearchMetrics {
    pub queries_total: u64,
    pub fallbacks_total: u64,
    pub avg_time_us: u64,
}

impl From<MetricsSnapshot> for MetricsResponse {
    fn from(s: MetricsSnapshot) -> Self {
        Self {
            http: HttpMetrics {
                requests_total: s.http_requests_total,
                requests_2xx: s.http_requests_2xx,
                requests_4xx: s.http_requests_4xx,
                requests_5xx: s.http_requests_5xx,
                latency_avg_us: s.http_request_latency_avg_us,
            },
            content: ContentMetrics {
                blogs_created: s.blogs_created,
                blogs_deleted: s.blogs_deleted,
                comments_created: s.comments_created,
                comments_deleted: s.comments_deleted,
                likes_toggled: s.likes_toggled,
                users_registered: s.users_registered,
            },
            consistency: ConsistencyMetrics {
                counter_sync_failures: s.counter_sync_failures,
                reconcile_runs: s.reconcile_runs,
                reconcile_rows_repaired: s.reconcile_rows_repaired,
            },
            search: SearchMetrics {
                queries_total: s.search_queries_total,
                fallbacks_total: s.search_fallbacks_total,
                avg_time_us: s.search_avg_time_us,
            },
        }
    }
}

async fn get_metrics_json() -> Json<MetricsResponse> {
    Json(MetricsResponse::from(get_metrics().snapshot()))
}

/// Get metrics in Prometheus text format.
async fn get_metrics_prometheus() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        get_metrics().to_prometheus(),
    )
        .into_response()
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe, mounted at `/health` outside `/api`.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
