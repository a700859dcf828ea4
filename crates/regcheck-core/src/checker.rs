//! # Single-Item Checker
//!
//! Runs one lookup for one normalized identifier and folds every possible
//! result (answer, error, deadline) into an [`ItemResult`]. Nothing escapes
//! as an error.

use std::time::Duration;

use crate::error::LookupError;
use crate::identifier::{NormalizedIdentifier, RawIdentifier};
use crate::lookup::LookupCollaborator;
use crate::outcome::{ItemResult, LookupOutcome};

/// Check one identifier against a collaborator.
///
/// Invalid identifiers short-circuit to [`LookupOutcome::Invalid`] without
/// calling the collaborator. Otherwise the collaborator is called exactly
/// once and raced against `timeout`; a lost race yields
/// [`LookupOutcome::TimedOut`] and the in-flight call is dropped. A
/// collaborator reporting its own timeout maps to the same outcome.
pub async fn check_one<C>(
    raw: RawIdentifier,
    normalized: NormalizedIdentifier,
    collaborator: &C,
    timeout: Duration,
) -> ItemResult<C::Record>
where
    C: LookupCollaborator + ?Sized,
{
    let canonical = match &normalized {
        NormalizedIdentifier::Canonical(c) => c.clone(),
        NormalizedIdentifier::Invalid { reason } => {
            tracing::debug!(raw = %raw, reason = %reason, "identifier rejected by normalizer");
            let outcome = LookupOutcome::Invalid(reason.clone());
            return ItemResult::new(raw, normalized, outcome, None);
        }
    };

    let (outcome, data) = match tokio::time::timeout(timeout, collaborator.lookup(&canonical)).await
    {
        Ok(Ok(Some(record))) => (LookupOutcome::Registered, Some(record)),
        Ok(Ok(None)) => (LookupOutcome::NotRegistered, None),
        Ok(Err(LookupError::Timeout)) | Err(_) => {
            tracing::warn!(
                identifier = %canonical,
                timeout_ms = timeout.as_millis() as u64,
                "lookup timed out"
            );
            (LookupOutcome::TimedOut, None)
        }
        Ok(Err(e)) => {
            tracing::warn!(identifier = %canonical, error = %e, "lookup failed");
            (LookupOutcome::ServiceError(e.to_string()), None)
        }
    };

    tracing::debug!(identifier = %canonical, outcome = outcome.label(), "lookup complete");
    ItemResult::new(raw, normalized, outcome, data)
}
