//! # Postal Code (CEP) API
//!
//! Validates Brazilian postal codes against ViaCEP. Malformed codes are
//! rejected locally and never reach the postal service.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use regcheck_client::PostalAddress;
use regcheck_core::{
    check_batch, check_one, format_postal_code, ItemResult, LookupOutcome, Normalizer,
    PostalNormalizer, RawIdentifier,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{
    extract_json, extract_validated_json, identifier_list, required_text, Validate,
};
use crate::state::{AppState, PostalService};

// -- Request DTOs -------------------------------------------------------------

/// Single validation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCepRequest {
    #[serde(alias = "cep")]
    pub code: Option<String>,
}

impl Validate for ValidateCepRequest {
    fn validate(&self) -> Result<(), String> {
        required_text("code", self.code.as_deref())
    }
}

/// Batch validation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCepBatchRequest {
    #[serde(alias = "ceps")]
    #[schema(value_type = Vec<String>)]
    pub codes: Option<serde_json::Value>,
}

// -- Response DTOs ------------------------------------------------------------

/// Address fields returned for a known code.
#[derive(Debug, Serialize, ToSchema)]
pub struct AddressSchema {
    pub cep: String,
    pub street: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub ibge: String,
    pub gia: String,
    pub ddd: String,
    pub siafi: String,
}

/// Result of validating one postal code.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CepValidation {
    /// The code as submitted.
    #[schema(value_type = Object)]
    pub input: RawIdentifier,
    pub is_valid: bool,
    pub message: String,
    /// Digits extracted from the input.
    pub cep: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<AddressSchema>)]
    pub data: Option<PostalAddress>,
}

impl From<ItemResult<PostalAddress>> for CepValidation {
    fn from(item: ItemResult<PostalAddress>) -> Self {
        let message = match &item.outcome {
            LookupOutcome::Registered => "Valid CEP".to_string(),
            LookupOutcome::NotRegistered => "Invalid CEP".to_string(),
            LookupOutcome::Invalid(reason) => reason.clone(),
            LookupOutcome::TimedOut => "Request timeout".to_string(),
            LookupOutcome::ServiceError(detail) => {
                format!("Error calling postal service: {detail}")
            }
        };
        let cep = item
            .raw_identifier
            .as_text()
            .map(|s| s.chars().filter(char::is_ascii_digit).collect())
            .unwrap_or_default();
        Self {
            is_valid: item.exists(),
            message,
            cep,
            data: item.data,
            input: item.raw_identifier,
        }
    }
}

/// Single validation response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CepResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: CepValidation,
}

/// Batch validation response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CepBatchResponse {
    pub success: bool,
    pub total: usize,
    pub processed: usize,
    /// Items that did not resolve to an answer (malformed, timed out, failed).
    pub errors: usize,
    pub valid: usize,
    pub invalid: usize,
    pub results: Vec<CepValidation>,
}

/// Formatting result.
#[derive(Debug, Serialize, ToSchema)]
pub struct CepFormatResponse {
    pub success: bool,
    pub original: String,
    pub clean: String,
    pub formatted: String,
}

/// Postal service status.
#[derive(Debug, Serialize, ToSchema)]
pub struct CepStatusResponse {
    pub success: bool,
    pub service: String,
    pub status: String,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}

/// Build the postal router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cep/validate", post(validate_body))
        .route("/api/cep/validate/batch", post(validate_batch))
        .route("/api/cep/validate/:code", get(validate_path))
        .route("/api/cep/format", post(format_code))
        .route("/api/cep/status", get(postal_status))
}

fn ready_service(state: &AppState) -> Result<PostalService, AppError> {
    state
        .postal
        .clone()
        .ok_or_else(|| AppError::not_ready("postal service is not configured"))
}

async fn validate_one(state: &AppState, service: &PostalService, code: String) -> CepValidation {
    let raw = RawIdentifier::from(code);
    let normalized = PostalNormalizer.normalize(&raw);
    check_one(raw, normalized, service.as_ref(), state.config.item_timeout())
        .await
        .into()
}

/// GET /api/cep/validate/{code}: Validate one postal code.
#[utoipa::path(
    get,
    path = "/api/cep/validate/{code}",
    params(("code" = String, Path, description = "Postal code, with or without hyphen")),
    responses(
        (status = 200, description = "Validation result", body = CepResponse),
        (status = 503, description = "Postal service not configured", body = crate::error::ErrorBody),
    ),
    tag = "postal"
)]
async fn validate_path(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CepResponse>, AppError> {
    let service = ready_service(&state)?;
    let result = validate_one(&state, &service, code).await;
    Ok(Json(CepResponse {
        success: true,
        result,
    }))
}

/// POST /api/cep/validate: Validate one postal code from the body.
#[utoipa::path(
    post,
    path = "/api/cep/validate",
    request_body = ValidateCepRequest,
    responses(
        (status = 200, description = "Validation result", body = CepResponse),
        (status = 400, description = "code missing", body = crate::error::ErrorBody),
        (status = 503, description = "Postal service not configured", body = crate::error::ErrorBody),
    ),
    tag = "postal"
)]
async fn validate_body(
    State(state): State<AppState>,
    body: Result<Json<ValidateCepRequest>, JsonRejection>,
) -> Result<Json<CepResponse>, AppError> {
    let service = ready_service(&state)?;
    let req = extract_validated_json(body)?;
    let result = validate_one(&state, &service, req.code.unwrap_or_default()).await;
    Ok(Json(CepResponse {
        success: true,
        result,
    }))
}

/// POST /api/cep/validate/batch: Validate a batch of postal codes.
#[utoipa::path(
    post,
    path = "/api/cep/validate/batch",
    request_body = ValidateCepBatchRequest,
    responses(
        (status = 200, description = "Per-code results in input order", body = CepBatchResponse),
        (status = 400, description = "Missing, empty, or oversized batch", body = crate::error::ErrorBody),
        (status = 503, description = "Postal service not configured", body = crate::error::ErrorBody),
    ),
    tag = "postal"
)]
async fn validate_batch(
    State(state): State<AppState>,
    body: Result<Json<ValidateCepBatchRequest>, JsonRejection>,
) -> Result<Json<CepBatchResponse>, AppError> {
    let service = ready_service(&state)?;
    let req = extract_json(body)?;
    let raw = identifier_list("codes", req.codes.as_ref()).map_err(AppError::BadRequest)?;

    let batch = check_batch(
        &raw,
        &PostalNormalizer,
        service.as_ref(),
        &state.config.batch_config(),
    )
    .await?;

    let total = batch.total();
    let processed = batch.processed();
    let errors = batch.error_count();
    let results: Vec<CepValidation> = batch.into_items().into_iter().map(Into::into).collect();
    let valid = results.iter().filter(|r| r.is_valid).count();

    Ok(Json(CepBatchResponse {
        success: true,
        total,
        processed,
        errors,
        valid,
        invalid: processed - valid,
        results,
    }))
}

/// GET /api/cep/status: Whether postal validation is available.
#[utoipa::path(
    get,
    path = "/api/cep/status",
    responses(
        (status = 200, description = "Postal validation is active", body = CepStatusResponse),
        (status = 503, description = "Postal service not configured", body = crate::error::ErrorBody),
    ),
    tag = "postal"
)]
async fn postal_status(State(state): State<AppState>) -> Result<Json<CepStatusResponse>, AppError> {
    ready_service(&state)?;
    Ok(Json(CepStatusResponse {
        success: true,
        service: "CEP Validator".to_string(),
        status: "active".to_string(),
        provider: "ViaCEP".to_string(),
        timestamp: Utc::now(),
    }))
}

/// POST /api/cep/format: Render a postal code as `NNNNN-NNN`.
#[utoipa::path(
    post,
    path = "/api/cep/format",
    request_body = ValidateCepRequest,
    responses(
        (status = 200, description = "Formatted code", body = CepFormatResponse),
        (status = 400, description = "Not an 8-digit code", body = crate::error::ErrorBody),
    ),
    tag = "postal"
)]
async fn format_code(
    body: Result<Json<ValidateCepRequest>, JsonRejection>,
) -> Result<Json<CepFormatResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let original = req.code.unwrap_or_default();
    let formatted =
        format_postal_code(&original).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let clean = formatted.replace('-', "");

    Ok(Json(CepFormatResponse {
        success: true,
        original,
        clean,
        formatted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regcheck_core::NormalizedIdentifier;

    fn item(raw: &str, outcome: LookupOutcome, data: Option<PostalAddress>) -> ItemResult<PostalAddress> {
        ItemResult::new(
            RawIdentifier::from(raw),
            NormalizedIdentifier::Canonical("01001000".into()),
            outcome,
            data,
        )
    }

    #[test]
    fn messages_follow_outcome() {
        let found = CepValidation::from(item(
            "01001-000",
            LookupOutcome::Registered,
            Some(PostalAddress::default()),
        ));
        assert!(found.is_valid);
        assert_eq!(found.message, "Valid CEP");
        assert_eq!(found.cep, "01001000");
        assert!(found.data.is_some());

        let missing = CepValidation::from(item("00000000", LookupOutcome::NotRegistered, None));
        assert!(!missing.is_valid);
        assert_eq!(missing.message, "Invalid CEP");

        let slow = CepValidation::from(item("01001000", LookupOutcome::TimedOut, None));
        assert_eq!(slow.message, "Request timeout");

        let failed = CepValidation::from(item(
            "01001000",
            LookupOutcome::ServiceError("connection refused".into()),
            None,
        ));
        assert_eq!(failed.message, "Error calling postal service: connection refused");
    }

    #[test]
    fn single_response_is_flat() {
        let response = CepResponse {
            success: true,
            result: CepValidation::from(item("123", LookupOutcome::Invalid("must have 8 digits".into()), None)),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["isValid"], false);
        assert_eq!(json["message"], "must have 8 digits");
        assert_eq!(json["cep"], "123");
        assert!(json.get("data").is_none());
    }
}
