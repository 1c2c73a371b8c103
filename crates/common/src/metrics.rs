//! Metrics collection for inkpost.
//!
//! Process-wide counters for request traffic, content activity, search, and
//! the health of denormalized counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get the global metrics instance.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new()))
}

/// Application metrics collector.
#[derive(Debug)]
pub struct Metrics {
    // === Request Metrics ===
    /// Total HTTP requests received
    pub http_requests_total: AtomicU64,
    /// HTTP requests by status code category (2xx, 4xx, 5xx)
    pub http_requests_2xx: AtomicU64,
    pub http_requests_4xx: AtomicU64,
    pub http_requests_5xx: AtomicU64,
    /// Total request latency in microseconds
    pub http_request_latency_us_total: AtomicU64,

    // === Content Metrics ===
    pub blogs_created: AtomicU64,
    pub blogs_deleted: AtomicU64,
    pub comments_created: AtomicU64,
    pub comments_deleted: AtomicU64,
    pub likes_toggled: AtomicU64,
    pub users_registered: AtomicU64,

    // === Consistency Metrics ===
    /// Follow-up writes (counter adjustments, comment purges) that failed
    /// after the primary write had committed
    pub counter_sync_failures: AtomicU64,
    /// Reconciliation passes completed
    pub reconcile_runs: AtomicU64,
    /// Rows corrected by reconciliation
    pub reconcile_rows_repaired: AtomicU64,

    // === Search Metrics ===
    /// Searches performed
    pub search_queries_total: AtomicU64,
    /// Searches answered by the substring fallback
    pub search_fallbacks_total: AtomicU64,
    /// Search time in microseconds
    pub search_time_us_total: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            http_requests_2xx: AtomicU64::new(0),
            http_requests_4xx: AtomicU64::new(0),
            http_requests_5xx: AtomicU64::new(0),
            http_request_latency_us_total: AtomicU64::new(0),

            blogs_created: AtomicU64::new(0),
            blogs_deleted: AtomicU64::new(0),
            comments_created: AtomicU64::new(0),
            comments_deleted: AtomicU64::new(0),
            likes_toggled: AtomicU64::new(0),
            users_registered: AtomicU64::new(0),

            counter_sync_failures: AtomicU64::new(0),
            reconcile_runs: AtomicU64::new(0),
            reconcile_rows_repaired: AtomicU64::new(0),

            search_queries_total: AtomicU64::new(0),
            search_fallbacks_total: AtomicU64::new(0),
            search_time_us_total: AtomicU64::new(0),
        }
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, status_code: u16, latency: Duration) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);

        match status_code {
            200..=299 => self.http_requests_2xx.fetch_add(1, Ordering::Relaxed),
            400..=499 => self.http_requests_4xx.fetch_add(1, Ordering::Relaxed),
            500..=599 => self.http_requests_5xx.fetch_add(1, Ordering::Relaxed),
            _ => 0,
        };

        self.http_request_latency_us_total
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record a failed follow-up write.
    pub fn record_counter_sync_failure(&self) {
        self.counter_sync_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed reconciliation pass.
    pub fn record_reconcile(&self, rows_repaired: u64) {
        self.reconcile_runs.fetch_add(1, Ordering::Relaxed);
        self.reconcile_rows_repaired
            .fetch_add(rows_repaired, Ordering::Relaxed);
    }

    /// Record a search query.
    pub fn record_search(&self, duration: Duration, used_fallback: bool) {
        self.search_queries_total.fetch_add(1, Ordering::Relaxed);
        if used_fallback {
            self.search_fallbacks_total.fetch_add(1, Ordering::Relaxed);
        }
        self.search_time_us_total
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            http_requests_total: self.http_requests_total.load(Ordering::Relaxed),
            http_requests_2xx: self.http_requests_2xx.load(Ordering::Relaxed),
            http_requests_4xx: self.http_requests_4xx.load(Ordering::Relaxed),
            http_requests_5xx: self.http_requests_5xx.load(Ordering::Relaxed),
            http_request_latency_avg_us: self.average_latency_us(),

            blogs_created: self.blogs_created.load(Ordering::Relaxed),
            blogs_deleted: self.blogs_deleted.load(Ordering::Relaxed),
            comments_created: self.comments_created.load(Ordering::Relaxed),
            comments_deleted: self.comments_deleted.load(Ordering::Relaxed),
            likes_toggled: self.likes_toggled.load(Ordering::Relaxed),
            users_registered: self.users_registered.load(Ordering::Relaxed),

            counter_sync_failures: self.counter_sync_failures.load(Ordering::Relaxed),
            reconcile_runs: self.reconcile_runs.load(Ordering::Relaxed),
            reconcile_rows_repaired: self.reconcile_rows_repaired.load(Ordering::Relaxed),

            search_queries_total: self.search_queries_total.load(Ordering::Relaxed),
            search_fallbacks_total: self.search_fallbacks_total.load(Ordering::Relaxed),
            search_avg_time_us: self.average_search_time_us(),
        }
    }

    /// Calculate average HTTP request latency.
    fn average_latency_us(&self) -> u64 {
        let total = self.http_request_latency_us_total.load(Ordering::Relaxed);
        let count = self.http_requests_total.load(Ordering::Relaxed);
        if count > 0 { total / count } else { 0 }
    }

    /// Calculate average search time.
    fn average_search_time_us(&self) -> u64 {
        let total = self.search_time_us_total.load(Ordering::Relaxed);
        let count = self.search_queries_total.load(Ordering::Relaxed);
        if count > 0 { total / count } else { 0 }
    }

    /// Export metrics in Prometheus format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let mut output = String::new();

        let mut counter = |name: &str, help: &str, value: u64| {
            output.push_str(&format!("# HELP inkpost_{name} {help}\n"));
            output.push_str(&format!("# TYPE inkpost_{name} counter\n"));
            output.push_str(&format!("inkpost_{name} {value}\n"));
        };

        counter("http_requests_total", "Total HTTP requests", s.http_requests_total);
        counter("blogs_created", "Blog posts created", s.blogs_created);
        counter("blogs_deleted", "Blog posts deleted", s.blogs_deleted);
        counter("comments_created", "Comments created", s.comments_created);
        counter("comments_deleted", "Comments deleted", s.comments_deleted);
        counter("likes_toggled", "Like toggles", s.likes_toggled);
        counter("users_registered", "Users registered", s.users_registered);
        counter(
            "counter_sync_failures",
            "Follow-up writes that failed after the primary write committed",
            s.counter_sync_failures,
        );
        counter("reconcile_runs", "Reconciliation passes", s.reconcile_runs);
        counter(
            "reconcile_rows_repaired",
            "Rows corrected by reconciliation",
            s.reconcile_rows_repaired,
        );
        counter("search_queries_total", "Searches performed", s.search_queries_total);
        counter(
            "search_fallbacks_total",
            "Searches answered by substring fallback",
            s.search_fallbacks_total,
        );

        output.push_str("# HELP inkpost_http_requests_by_status HTTP requests by status\n");
        output.push_str("# TYPE inkpost_http_requests_by_status counter\n");
        output.push_str(&format!(
            "inkpost_http_requests_by_status{{status=\"2xx\"}} {}\n",
            s.http_requests_2xx
        ));
        output.push_str(&format!(
            "inkpost_http_requests_by_status{{status=\"4xx\"}} {}\n",
            s.http_requests_4xx
        ));
        output.push_str(&format!(
            "inkpost_http_requests_by_status{{status=\"5xx\"}} {}\n",
            s.http_requests_5xx
        ));

        output.push_str("# HELP inkpost_http_request_latency_avg_us Average request latency\n");
        output.push_str("# TYPE inkpost_http_request_latency_avg_us gauge\n");
        output.push_str(&format!(
            "inkpost_http_request_latency_avg_us {}\n",
            s.http_request_latency_avg_us
        ));

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of all metrics at a point in time.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    // HTTP
    pub http_requests_total: u64,
    pub http_requests_2xx: u64,
    pub http_requests_4xx: u64,
    pub http_requests_5xx: u64,
    pub http_request_latency_avg_us: u64,

    // Content
    pub blogs_created: u64,
    pub blogs_deleted: u64,
    pub comments_created: u64,
    pub comments_deleted: u64,
    pub likes_toggled: u64,
    pub users_registered: u64,

    // Consistency
    pub counter_sync_failures: u64,
    pub reconcile_runs: u64,
    pub reconcile_rows_repaired: u64,

    // Search
    pub search_queries_total: u64,
    pub search_fallbacks_total: u64,
    pub search_avg_time_us: u64,
}

/// Timer guard for measuring operation duration.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.http_requests_total.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.comments_created.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_http_request() {
        let metrics = Metrics::new();

        metrics.record_http_request(200, Duration::from_millis(50));
        metrics.record_http_request(404, Duration::from_millis(10));
        metrics.record_http_request(500, Duration::from_millis(100));

        assert_eq!(metrics.http_requests_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.http_requests_2xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_4xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_5xx.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_record_search_with_fallback() {
        let metrics = Metrics::new();

        metrics.record_search(Duration::from_micros(100), false);
        metrics.record_search(Duration::from_micros(300), true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.search_queries_total, 2);
        assert_eq!(snapshot.search_fallbacks_total, 1);
        assert_eq!(snapshot.search_avg_time_us, 200);
    }

    #[test]
    fn test_record_reconcile() {
        let metrics = Metrics::new();
        metrics.record_counter_sync_failure();
        metrics.record_reconcile(7);
        metrics.record_reconcile(0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.counter_sync_failures, 1);
        assert_eq!(snapshot.reconcile_runs, 2);
        assert_eq!(snapshot.reconcile_rows_repaired, 7);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.record_http_request(200, Duration::from_millis(50));
        metrics.record_counter_sync_failure();

        let prometheus = metrics.to_prometheus();
        assert!(prometheus.contains("inkpost_http_requests_total 1"));
        assert!(prometheus.contains("inkpost_http_requests_by_status{status=\"2xx\"} 1"));
        assert!(prometheus.contains("inkpost_counter_sync_failures 1"));
    }

    #[test]
    fn test_average_latency_empty() {
        let metrics = Metrics::new();
        assert_eq!(metrics.average_latency_us(), 0);
    }

    #[test]
    fn test_average_latency() {
        let metrics = Metrics::new();
        metrics.record_http_request(200, Duration::from_micros(100));
        metrics.record_http_request(200, Duration::from_micros(200));
        assert_eq!(metrics.average_latency_us(), 150);
    }
}
