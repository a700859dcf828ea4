//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! and validate JSON bodies in handlers. Every failure is a 400 whose
//! message names the offending field.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use regcheck_core::RawIdentifier;

use crate::error::AppError;

/// Trait for request types that can validate their business rules
/// beyond what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::BadRequest)?;
    Ok(value)
}

/// Interpret a loosely-typed body field as a list of raw identifiers.
///
/// The field must be a JSON array; its elements may be anything; non-string
/// elements become malformed identifiers rather than failing the request.
pub fn identifier_list(
    field: &'static str,
    value: Option<&serde_json::Value>,
) -> Result<Vec<RawIdentifier>, String> {
    match value {
        Some(serde_json::Value::Array(items)) => {
            Ok(items.iter().cloned().map(RawIdentifier::from).collect())
        }
        _ => Err(format!("{field} array is required")),
    }
}

/// Require a non-blank string field.
pub fn required_text(field: &'static str, value: Option<&str>) -> Result<(), String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(format!("{field} is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_list_requires_array() {
        assert_eq!(
            identifier_list("phoneNumbers", None).unwrap_err(),
            "phoneNumbers array is required"
        );
        let not_array = serde_json::json!("5511987654321");
        assert!(identifier_list("phoneNumbers", Some(&not_array)).is_err());
    }

    #[test]
    fn identifier_list_keeps_malformed_elements() {
        let value = serde_json::json!(["11987654321", null, 7]);
        let ids = identifier_list("phoneNumbers", Some(&value)).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0].as_text(), Some("11987654321"));
        assert!(ids[1].as_text().is_none());
    }

    #[test]
    fn required_text_rejects_blank() {
        assert!(required_text("phoneNumber", Some("  ")).is_err());
        assert!(required_text("phoneNumber", None).is_err());
        assert!(required_text("phoneNumber", Some("11")).is_ok());
    }
}
