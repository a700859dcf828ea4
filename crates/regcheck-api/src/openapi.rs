//! # OpenAPI Document Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "regcheck API",
        version = "0.1.0",
        description = "Phone number registration checks and Brazilian postal code validation.",
        license(name = "MIT")
    ),
    paths(
        // Registration
        crate::routes::registration::check_number,
        crate::routes::registration::check_numbers,
        crate::routes::registration::format_number,
        // Session
        crate::routes::registration::pairing_code,
        crate::routes::registration::reset_session,
        // Postal
        crate::routes::postal::validate_path,
        crate::routes::postal::validate_body,
        crate::routes::postal::validate_batch,
        crate::routes::postal::format_code,
        crate::routes::postal::postal_status,
        // Status
        crate::routes::status::health,
        crate::routes::status::status,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::registration::CheckRequest,
        crate::routes::registration::CheckBatchRequest,
        crate::routes::registration::ResetSessionRequest,
        crate::routes::registration::CheckResponse,
        crate::routes::registration::CheckBatchResponse,
        crate::routes::registration::FormatResponse,
        crate::routes::registration::PairingCodeResponse,
        crate::routes::registration::ResetSessionResponse,
        crate::routes::postal::ValidateCepRequest,
        crate::routes::postal::ValidateCepBatchRequest,
        crate::routes::postal::AddressSchema,
        crate::routes::postal::CepValidation,
        crate::routes::postal::CepResponse,
        crate::routes::postal::CepBatchResponse,
        crate::routes::postal::CepFormatResponse,
        crate::routes::postal::CepStatusResponse,
        crate::routes::status::HealthResponse,
        crate::routes::status::StatusResponse,
        crate::middleware::metrics::MetricsSnapshot,
    )),
    tags(
        (name = "registration", description = "Phone number registration checks"),
        (name = "session", description = "Registration session pairing"),
        (name = "postal", description = "Brazilian postal code (CEP) validation"),
        (name = "status", description = "Liveness and status probes"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
