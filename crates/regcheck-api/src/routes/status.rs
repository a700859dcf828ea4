//! # Health and Status
//!
//! Unauthenticated probes. `/health` is liveness only and never consults
//! the collaborators; `/status` reports the registration session.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use regcheck_core::SessionSnapshot;
use serde::Serialize;
use utoipa::ToSchema;

use crate::middleware::metrics::MetricsSnapshot;
use crate::state::AppState;

/// Liveness response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: i64,
}

/// Service status.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    /// Whether registration checks are currently accepted.
    pub ready: bool,
    #[schema(value_type = Object)]
    pub session: SessionSnapshot,
    pub registration_configured: bool,
    pub postal_enabled: bool,
    pub uptime_secs: i64,
    pub requests: u64,
    pub errors: u64,
    pub metrics: MetricsSnapshot,
}

/// Build the status router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
}

/// GET /health: Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Process is alive", body = HealthResponse)),
    tag = "status"
)]
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime_secs: state.uptime_secs(),
    })
}

/// GET /status: Session state and request counters.
#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Service status", body = StatusResponse)),
    tag = "status"
)]
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        ready: state.registration_ready(),
        session: state.session.snapshot(),
        registration_configured: state.registration.is_some(),
        postal_enabled: state.config.enable_cep && state.postal.is_some(),
        uptime_secs: state.uptime_secs(),
        requests: state.metrics.requests(),
        errors: state.metrics.errors(),
        metrics: state.metrics.snapshot(),
    })
}
