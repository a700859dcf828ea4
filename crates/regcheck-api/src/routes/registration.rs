//! # Registration Check API
//!
//! Phone number registration checks against the messaging network, plus the
//! session endpoints that support pairing.
//!
//! Every check endpoint consults the readiness gate before looking at the
//! request body: while the session is pairing or disconnected the caller gets
//! a 503 and the collaborator is never called.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use regcheck_core::{
    check_batch, check_one, ItemResult, Normalizer, PhoneNormalizer, RawIdentifier,
    ReadinessGate,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{
    extract_json, extract_validated_json, identifier_list, required_text, Validate,
};
use crate::state::{AppState, RegistrationService};

// -- Request DTOs -------------------------------------------------------------

/// Single check request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub phone_number: Option<String>,
    /// Region prefix override for this request.
    #[serde(default)]
    pub country_code: Option<String>,
}

impl Validate for CheckRequest {
    fn validate(&self) -> Result<(), String> {
        required_text("phoneNumber", self.phone_number.as_deref())
    }
}

/// Batch check request.
///
/// `phoneNumbers` is kept loosely typed so that non-string elements become
/// invalid items instead of failing the whole request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckBatchRequest {
    #[schema(value_type = Vec<String>)]
    pub phone_numbers: Option<serde_json::Value>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Session reset request. The body is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetSessionRequest {
    /// Discard the stored pairing so a new code is issued. Defaults to true.
    #[serde(default)]
    pub clear_session: Option<bool>,
}

// -- Response DTOs ------------------------------------------------------------

/// Single check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub result: ItemResult,
}

/// Batch check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckBatchResponse {
    pub success: bool,
    pub total: usize,
    pub processed: usize,
    /// Items whose lookup did not produce an answer.
    pub errors: usize,
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<ItemResult>,
}

/// Normalization preview.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormatResponse {
    pub success: bool,
    pub original: String,
    /// Canonical form, or `"N/A"` under the strict policy.
    pub formatted: String,
    pub country_code: String,
}

/// Current pairing code.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PairingCodeResponse {
    pub success: bool,
    pub pairing_code: String,
}

/// Accepted session reset.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetSessionResponse {
    pub success: bool,
    pub message: String,
    pub clear_session: bool,
}

/// Build the registration router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/check", post(check_number))
        .route("/api/check-batch", post(check_numbers))
        .route("/api/format", post(format_number))
        .route("/api/qr", get(pairing_code))
        .route("/api/session/reset", post(reset_session))
}

/// Readiness gate for registration checks.
fn ready_service(state: &AppState) -> Result<RegistrationService, AppError> {
    match &state.registration {
        Some(service) if state.session.is_ready() => Ok(service.clone()),
        Some(_) => Err(AppError::ServiceNotReady(format!(
            "registration session is not ready (state: {})",
            state.session.state()
        ))),
        None => Err(AppError::not_ready(
            "registration service is not configured",
        )),
    }
}

fn normalizer_for(state: &AppState, country_code: Option<&str>) -> PhoneNormalizer {
    state.config.phone_normalizer().with_prefix(country_code)
}

/// POST /api/check: Check whether one phone number is registered.
#[utoipa::path(
    post,
    path = "/api/check",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Check result", body = CheckResponse),
        (status = 400, description = "phoneNumber missing", body = crate::error::ErrorBody),
        (status = 503, description = "Session not ready", body = crate::error::ErrorBody),
    ),
    tag = "registration"
)]
async fn check_number(
    State(state): State<AppState>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, AppError> {
    let service = ready_service(&state)?;
    let req = extract_validated_json(body)?;

    let normalizer = normalizer_for(&state, req.country_code.as_deref());
    let raw = RawIdentifier::from(req.phone_number.unwrap_or_default());
    let normalized = normalizer.normalize(&raw);
    let result = check_one(raw, normalized, service.as_ref(), state.config.item_timeout()).await;

    Ok(Json(CheckResponse {
        success: true,
        result,
    }))
}

/// POST /api/check-batch: Check a batch of phone numbers.
#[utoipa::path(
    post,
    path = "/api/check-batch",
    request_body = CheckBatchRequest,
    responses(
        (status = 200, description = "Per-item results in input order", body = CheckBatchResponse),
        (status = 400, description = "Missing, empty, or oversized batch", body = crate::error::ErrorBody),
        (status = 503, description = "Session not ready", body = crate::error::ErrorBody),
    ),
    tag = "registration"
)]
async fn check_numbers(
    State(state): State<AppState>,
    body: Result<Json<CheckBatchRequest>, JsonRejection>,
) -> Result<Json<CheckBatchResponse>, AppError> {
    let service = ready_service(&state)?;
    let req = extract_json(body)?;
    let raw = identifier_list("phoneNumbers", req.phone_numbers.as_ref())
        .map_err(AppError::BadRequest)?;

    let normalizer = normalizer_for(&state, req.country_code.as_deref());
    let batch = check_batch(
        &raw,
        &normalizer,
        service.as_ref(),
        &state.config.batch_config(),
    )
    .await?;

    Ok(Json(CheckBatchResponse {
        success: true,
        total: batch.total(),
        processed: batch.processed(),
        errors: batch.error_count(),
        results: batch.into_items(),
    }))
}

/// POST /api/format: Show how a phone number would be normalized.
#[utoipa::path(
    post,
    path = "/api/format",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Normalized form", body = FormatResponse),
        (status = 400, description = "phoneNumber missing", body = crate::error::ErrorBody),
    ),
    tag = "registration"
)]
async fn format_number(
    State(state): State<AppState>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<FormatResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let normalizer = normalizer_for(&state, req.country_code.as_deref());
    let original = req.phone_number.unwrap_or_default();
    let formatted = normalizer.normalize_str(&original).to_string();

    Ok(Json(FormatResponse {
        success: true,
        original,
        formatted,
        country_code: normalizer.region_prefix().to_string(),
    }))
}

/// GET /api/qr: Latest pairing code issued by the bridge.
#[utoipa::path(
    get,
    path = "/api/qr",
    responses(
        (status = 200, description = "Pairing code", body = PairingCodeResponse),
        (status = 404, description = "No pairing in progress", body = crate::error::ErrorBody),
    ),
    tag = "session"
)]
async fn pairing_code(
    State(state): State<AppState>,
) -> Result<Json<PairingCodeResponse>, AppError> {
    let code = state.session.pairing_code().ok_or_else(|| {
        AppError::NotFound(format!(
            "no pairing code available (state: {})",
            state.session.state()
        ))
    })?;
    Ok(Json(PairingCodeResponse {
        success: true,
        pairing_code: code,
    }))
}

/// POST /api/session/reset: Ask the bridge to restart its session.
///
/// The restart runs in the background; the supervisor observes the result
/// through the usual session events.
#[utoipa::path(
    post,
    path = "/api/session/reset",
    request_body(content = ResetSessionRequest, description = "Optional"),
    responses(
        (status = 202, description = "Restart requested", body = ResetSessionResponse),
        (status = 503, description = "No session controller", body = crate::error::ErrorBody),
    ),
    tag = "session"
)]
async fn reset_session(
    State(state): State<AppState>,
    body: Option<Json<ResetSessionRequest>>,
) -> Result<(StatusCode, Json<ResetSessionResponse>), AppError> {
    let controller = state
        .controller
        .clone()
        .ok_or_else(|| AppError::not_ready("session controller is not configured"))?;
    let clear_session = body
        .and_then(|Json(req)| req.clear_session)
        .unwrap_or(true);

    tracing::warn!(clear_session, "session reset requested via API");
    tokio::spawn(async move {
        if let Err(e) = controller.restart(clear_session).await {
            tracing::error!(error = %e, "session reset failed");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ResetSessionResponse {
            success: true,
            message: "session restart requested".to_string(),
            clear_session,
        }),
    ))
}
