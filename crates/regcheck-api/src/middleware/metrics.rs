//! # Request Metrics
//!
//! In-process request counters reported by `GET /status`. Responses are
//! bucketed by status class, with readiness rejections (503) and throttled
//! requests (429) tracked separately so an operator can tell a pairing
//! session apart from a misbehaving client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    not_ready: AtomicU64,
    rate_limited: AtomicU64,
}

/// Shared metrics state. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    counters: Arc<Counters>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    /// 503 responses, mostly the readiness gate turning checks away.
    pub not_ready: u64,
    /// 429 responses from the rate limiter.
    pub rate_limited: u64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one completed response.
    pub fn record(&self, status: StatusCode) {
        let c = &self.counters;
        c.requests.fetch_add(1, Ordering::Relaxed);
        if status.is_client_error() {
            c.client_errors.fetch_add(1, Ordering::Relaxed);
        } else if status.is_server_error() {
            c.server_errors.fetch_add(1, Ordering::Relaxed);
        }
        match status {
            StatusCode::SERVICE_UNAVAILABLE => {
                c.not_ready.fetch_add(1, Ordering::Relaxed);
            }
            StatusCode::TOO_MANY_REQUESTS => {
                c.rate_limited.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn requests(&self) -> u64 {
        self.counters.requests.load(Ordering::Relaxed)
    }

    /// All 4xx and 5xx responses.
    pub fn errors(&self) -> u64 {
        self.counters.client_errors.load(Ordering::Relaxed)
            + self.counters.server_errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            requests: c.requests.load(Ordering::Relaxed),
            client_errors: c.client_errors.load(Ordering::Relaxed),
            server_errors: c.server_errors.load(Ordering::Relaxed),
            not_ready: c.not_ready.load(Ordering::Relaxed),
            rate_limited: c.rate_limited.load(Ordering::Relaxed),
        }
    }
}

/// Middleware that records every response.
///
/// Batch calls that return 200 with failed items count as successes; the
/// per-item failures are reported in the body.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record(response.status());
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn record_buckets_by_status() {
        let metrics = ApiMetrics::new();
        metrics.record(StatusCode::OK);
        metrics.record(StatusCode::SERVICE_UNAVAILABLE);
        metrics.record(StatusCode::TOO_MANY_REQUESTS);
        metrics.record(StatusCode::BAD_REQUEST);

        let snap = metrics.snapshot();
        assert_eq!(snap.requests, 4);
        assert_eq!(snap.client_errors, 2);
        assert_eq!(snap.server_errors, 1);
        assert_eq!(snap.not_ready, 1);
        assert_eq!(snap.rate_limited, 1);
        assert_eq!(metrics.errors(), 3);
    }

    #[tokio::test]
    async fn middleware_counts_through_clones() {
        let metrics = ApiMetrics::new();
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/busy", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .layer(from_fn(metrics_middleware))
            .layer(axum::Extension(metrics.clone()));

        for uri in ["/ok", "/ok", "/busy"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            app.clone().oneshot(request).await.unwrap();
        }

        assert_eq!(metrics.requests(), 3);
        assert_eq!(metrics.snapshot().not_ready, 1);
    }
}
