//! # regcheck-client: Typed clients for the lookup collaborators
//!
//! Two external services back the validation core:
//! - **Registration bridge**: an HTTP sidecar that owns the browser-automation
//!   session with the messaging network and answers "is this number
//!   registered?".
//! - **ViaCEP**: the public Brazilian postal code service.
//!
//! Both clients implement [`regcheck_core::LookupCollaborator`], so the batch
//! orchestrator can drive either one. The bridge also implements
//! [`regcheck_core::SessionController`] and feeds [`SessionPoller`].
//!
//! ## Timeouts
//!
//! Each client applies its own request timeout. A transport timeout surfaces
//! as [`regcheck_core::LookupError::Timeout`], which the checker reports as
//! a timed-out item.

pub mod bridge;
pub mod config;
pub mod error;
pub mod poller;
pub mod postal;

pub use bridge::{BridgeState, RegistrationBridge, SessionReport};
pub use config::{BridgeConfig, ConfigError, PostalConfig};
pub use error::ClientError;
pub use poller::SessionPoller;
pub use postal::{PostalAddress, ViaCepClient};

use serde::de::DeserializeOwned;

/// Longest upstream error body kept, in characters.
pub(crate) const ERROR_BODY_EXCERPT_CHARS: usize = 200;

/// Join a relative path onto a base URL, tolerating a trailing slash.
pub(crate) fn join_url(base: &url::Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path)
}

/// Map a non-2xx response to [`ClientError::ApiError`].
pub(crate) async fn ensure_success(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = body_excerpt(&resp.text().await.unwrap_or_default());
    Err(ClientError::ApiError {
        endpoint: endpoint.into(),
        status,
        body,
    })
}

/// Whitespace-collapsed prefix of an error body, marked with `...` when cut.
pub(crate) fn body_excerpt(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(ERROR_BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}

/// Check the status, then decode the JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    ensure_success(endpoint, resp)
        .await?
        .json()
        .await
        .map_err(|e| ClientError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
}
