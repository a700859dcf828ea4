//! # Per-Client Rate Limiting
//!
//! Fixed-window request counter keyed by the peer IP address. In-memory
//! only; each process enforces its own budget.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::error::AppError;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

/// Per-key rate limit state.
#[derive(Debug, Clone)]
struct BucketState {
    count: u64,
    window_start: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<String, BucketState>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if a request from the given key should be allowed.
    fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();
        let window = Duration::from_secs(self.config.window_secs);

        // Expired windows are dropped; the next request opens a fresh one.
        buckets.retain(|_, b| now.duration_since(b.window_start) < window);

        let bucket = buckets.entry(key.to_string()).or_insert(BucketState {
            count: 0,
            window_start: now,
        });

        if bucket.count >= self.config.max_requests {
            false
        } else {
            bucket.count += 1;
            true
        }
    }
}

/// Middleware that enforces per-client rate limits.
///
/// The key is the peer IP from `ConnectInfo`. Requests without connection
/// info (in-process tests) share the `"unknown"` bucket.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let key = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if !limiter.check(&key) {
            tracing::warn!(client = %key, "rate limit exceeded");
            return AppError::RateLimited.into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window_secs: 60,
        })
    }

    #[test]
    fn allows_up_to_budget_then_rejects() {
        let l = limiter(2);
        let now = Instant::now();
        assert!(l.check_at("10.0.0.1", now));
        assert!(l.check_at("10.0.0.1", now));
        assert!(!l.check_at("10.0.0.1", now));
    }

    #[test]
    fn keys_are_independent() {
        let l = limiter(1);
        let now = Instant::now();
        assert!(l.check_at("10.0.0.1", now));
        assert!(l.check_at("10.0.0.2", now));
        assert!(!l.check_at("10.0.0.1", now));
    }

    #[test]
    fn window_rollover_resets_budget() {
        let l = limiter(1);
        let now = Instant::now();
        assert!(l.check_at("10.0.0.1", now));
        assert!(!l.check_at("10.0.0.1", now + Duration::from_secs(30)));
        assert!(l.check_at("10.0.0.1", now + Duration::from_secs(61)));
    }
}
