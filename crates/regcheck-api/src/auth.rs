//! # API Key Middleware
//!
//! Optional shared-secret check on every `/api/*` route. The key is read from
//! the `x-api-key` header, falling back to the `apiKey` query parameter.
//! When no key is configured, all requests pass.

use axum::extract::{Query, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::AppError;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared API secret. Zeroed on drop, never printed.
#[derive(Clone)]
pub struct ApiKey(Zeroizing<String>);

impl ApiKey {
    /// Wrap a configured key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(Zeroizing::new(key.into()))
    }

    /// Constant-time comparison against a provided key.
    ///
    /// When lengths differ, performs a dummy comparison so the timing does
    /// not reveal the expected length.
    pub fn matches(&self, provided: &str) -> bool {
        let provided = provided.as_bytes();
        let expected = self.0.as_bytes();
        if provided.len() != expected.len() {
            let _ = expected.ct_eq(expected);
            return false;
        }
        provided.ct_eq(expected).into()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Auth configuration injected into request extensions.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub api_key: Option<ApiKey>,
}

#[derive(Debug, Deserialize)]
struct ApiKeyQuery {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

fn provided_key(request: &Request) -> Option<String> {
    if let Some(value) = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(value.to_string());
    }
    Query::<ApiKeyQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.api_key)
}

/// Reject requests whose API key is missing or wrong.
pub async fn api_key_middleware(request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.api_key.clone());

    let Some(expected) = expected else {
        return next.run(request).await;
    };

    match provided_key(&request) {
        Some(provided) if expected.matches(&provided) => next.run(request).await,
        Some(_) => {
            tracing::warn!("authentication failed: invalid API key");
            AppError::Unauthorized("invalid API key".into()).into_response()
        }
        None => {
            tracing::warn!("authentication failed: missing API key");
            AppError::Unauthorized("missing API key".into()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Build a minimal router with the API key middleware and a simple handler.
    fn test_app(key: Option<&str>) -> Router {
        let auth_config = AuthConfig {
            api_key: key.map(ApiKey::new),
        };
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(from_fn(api_key_middleware))
            .layer(axum::Extension(auth_config))
    }

    async fn error_code(response: Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        err["error"]["code"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn header_key_accepted() {
        let request = Request::builder()
            .uri("/test")
            .header("x-api-key", "s3cret")
            .body(Body::empty())
            .unwrap();
        let response = test_app(Some("s3cret")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn query_key_accepted() {
        let request = Request::builder()
            .uri("/test?apiKey=s3cret")
            .body(Body::empty())
            .unwrap();
        let response = test_app(Some("s3cret")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_key_rejected() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = test_app(Some("s3cret")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn wrong_key_rejected() {
        let request = Request::builder()
            .uri("/test")
            .header("x-api-key", "guess")
            .body(Body::empty())
            .unwrap();
        let response = test_app(Some("s3cret")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn no_configured_key_allows_all() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = test_app(None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn debug_redacts_key() {
        let rendered = format!("{:?}", ApiKey::new("s3cret"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn matches_is_exact() {
        let key = ApiKey::new("abc");
        assert!(key.matches("abc"));
        assert!(!key.matches("abcd"));
        assert!(!key.matches("abd"));
    }
}
