//! Collaborator client error types.

use regcheck_core::LookupError;

/// Errors from bridge and postal service calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The service returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl From<ClientError> for LookupError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http { ref source, .. } if source.is_timeout() => LookupError::Timeout,
            ClientError::Http { .. } | ClientError::Config(_) => {
                LookupError::Unavailable(err.to_string())
            }
            ClientError::ApiError { status, body, .. } => LookupError::Upstream { status, body },
            ClientError::Deserialization { .. } => LookupError::Malformed(err.to_string()),
        }
    }
}
