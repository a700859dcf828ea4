//! # Result Records
//!
//! Per-item and per-batch result types. Both are request-scoped values:
//! built once by the checker or orchestrator, serialized into the response,
//! then dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identifier::{NormalizedIdentifier, RawIdentifier};

/// Outcome of checking a single identifier. Exactly one per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// The identifier is registered (phone) or resolves to a record (postal).
    Registered,
    /// The collaborator answered that the identifier is not known.
    NotRegistered,
    /// Normalization rejected the identifier; no lookup was made.
    Invalid(String),
    /// The lookup did not complete before the per-item deadline.
    TimedOut,
    /// The collaborator failed for this item.
    ServiceError(String),
}

impl LookupOutcome {
    /// True for the two outcomes in which the collaborator gave an answer.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Registered | Self::NotRegistered)
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::NotRegistered => "not_registered",
            Self::Invalid(_) => "invalid",
            Self::TimedOut => "timed_out",
            Self::ServiceError(_) => "service_error",
        }
    }
}

/// Result for one input identifier.
///
/// `D` is the record type the collaborator returns on a match: `()` for
/// registration checks, a postal address for CEP checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult<D = ()> {
    /// The identifier exactly as supplied by the caller.
    pub raw_identifier: RawIdentifier,
    /// Canonical form, or `"N/A"` when invalid.
    pub normalized_identifier: NormalizedIdentifier,
    /// What happened.
    pub outcome: LookupOutcome,
    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
    /// Record returned by the collaborator on a match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<D>,
}

impl<D> ItemResult<D> {
    /// Build a result stamped with the current time.
    pub fn new(
        raw_identifier: RawIdentifier,
        normalized_identifier: NormalizedIdentifier,
        outcome: LookupOutcome,
        data: Option<D>,
    ) -> Self {
        Self {
            raw_identifier,
            normalized_identifier,
            outcome,
            timestamp: Utc::now(),
            data,
        }
    }

    /// Whether the identifier was found.
    pub fn exists(&self) -> bool {
        self.outcome == LookupOutcome::Registered
    }
}

/// Aggregate result for one batch call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult<D = ()> {
    total: usize,
    processed: usize,
    error_count: usize,
    items: Vec<ItemResult<D>>,
}

impl<D> BatchResult<D> {
    /// Build the aggregate, deriving `processed` and `error_count` from `items`.
    pub fn from_items(total: usize, items: Vec<ItemResult<D>>) -> Self {
        let error_count = items.iter().filter(|i| !i.outcome.is_success()).count();
        Self {
            total,
            processed: items.len(),
            error_count,
            items,
        }
    }

    /// Number of identifiers submitted.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of item results produced.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Number of items whose outcome is not a success outcome.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Per-item results in input order.
    pub fn items(&self) -> &[ItemResult<D>] {
        &self.items
    }

    /// Consume the aggregate, returning the per-item results.
    pub fn into_items(self) -> Vec<ItemResult<D>> {
        self.items
    }
}
