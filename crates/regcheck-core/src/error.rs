//! # Error Hierarchy
//!
//! Structured error types for the validation core, built with `thiserror`.
//!
//! Only [`BatchError`] ever reaches a caller as a request-level failure.
//! [`LookupError`] is always folded into a per-item outcome by the checker.

use thiserror::Error;

/// Structural batch errors, raised before any normalization or lookup runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The batch contained no identifiers.
    #[error("batch cannot be empty")]
    EmptyBatch,

    /// The batch exceeds the configured maximum size.
    #[error("Batch size exceeds maximum limit of {limit}")]
    BatchTooLarge {
        /// The configured maximum batch size.
        limit: usize,
        /// The number of identifiers submitted.
        actual: usize,
    },
}

/// Failure reported by a lookup collaborator for a single identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The collaborator could not be reached or is not in a usable state.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered with a non-success status.
    #[error("upstream returned {status}: {body}")]
    Upstream {
        /// HTTP-style status code reported by the upstream.
        status: u16,
        /// Response body excerpt.
        body: String,
    },

    /// The collaborator gave up on the request before answering.
    #[error("upstream request timed out")]
    Timeout,

    /// The collaborator's answer could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors from identifier formatting utilities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Postal code does not contain exactly 8 digits.
    #[error("CEP must have 8 digits")]
    InvalidPostalCode(String),
}
