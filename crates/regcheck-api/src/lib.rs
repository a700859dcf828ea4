//! # regcheck-api: Axum HTTP Surface
//!
//! Thin transport adapter over `regcheck-core`. Handlers parse the request,
//! consult the readiness gate, and hand off to the checker or the batch
//! orchestrator. They hold no business logic of their own.
//!
//! ## API Surface
//!
//! | Prefix              | Module                      | Auth |
//! |---------------------|-----------------------------|------|
//! | `/api/check*`       | [`routes::registration`]    | yes  |
//! | `/api/format`       | [`routes::registration`]    | yes  |
//! | `/api/qr`, `/api/session/*` | [`routes::registration`] | yes |
//! | `/api/cep/*`        | [`routes::postal`]          | yes  |
//! | `/health`, `/status`| [`routes::status`]          | no   |
//! | `/openapi.json`     | [`openapi`]                 | no   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → CorsLayer → MetricsMiddleware → CatchPanicLayer → ApiKeyMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! A panic that escapes a handler becomes a 500 `INTERNAL_ERROR` and is
//! still counted by the metrics middleware.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::rate_limit::RateLimiter;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
///
/// Health, status, and the OpenAPI document are mounted outside the API key
/// and rate limit middleware so probes never need credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        api_key: state.config.api_key.clone(),
    };
    let metrics = state.metrics.clone();
    let limiter = RateLimiter::new(state.config.rate_limit.clone());
    let cors = cors_layer(&state.config.cors_origin);

    let mut api = Router::new().merge(routes::registration::router());
    if state.config.enable_cep {
        api = api.merge(routes::postal::router());
    }
    let api = api
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::api_key_middleware));

    let public = Router::new()
        .merge(routes::status::router())
        .merge(openapi::router());

    Router::new()
        .merge(public)
        .merge(api)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .layer(axum::Extension(limiter))
        .with_state(state)
}

/// Build the CORS layer from a comma-separated origin list, or `*` for any.
fn cors_layer(origins: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(auth::API_KEY_HEADER),
        ]);

    if origins.trim() == "*" {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}
