//! Typed client for the registration bridge.
//!
//! The bridge is an HTTP sidecar that owns the browser-automation session
//! with the messaging network. It exposes three endpoints:
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | POST   | `/contacts/lookup` | is a contact id registered? |
//! | GET    | `/session` | current session state and pairing code |
//! | POST   | `/session/reset` | restart the session, optionally clearing it |

use std::time::Duration;

use async_trait::async_trait;
use regcheck_core::{LookupCollaborator, LookupError, SessionController, SessionEvent};
use serde::{Deserialize, Serialize};

use crate::config::{BridgeConfig, ConfigError};
use crate::error::ClientError;

/// Suffix the messaging network appends to individual contact ids.
pub const CONTACT_SUFFIX: &str = "@c.us";

// -- Types matching the bridge schemas ----------------------------------------

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    registered: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetRequest {
    clear_session: bool,
}

/// Session state as reported by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeState {
    Unpaired,
    Pairing,
    Authenticated,
    Connected,
    Disconnected,
    AuthFailure,
    /// Any state this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Response of `GET /session`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionReport {
    pub state: BridgeState,
    /// Pairing code to render as a QR image, while unpaired.
    #[serde(default)]
    pub qr: Option<String>,
    /// Failure reason for `DISCONNECTED` and `AUTH_FAILURE`.
    #[serde(default)]
    pub reason: Option<String>,
}

impl SessionReport {
    /// Translate the report into a lifecycle event.
    ///
    /// Returns `None` only for states this client does not recognize.
    pub fn to_event(&self) -> Option<SessionEvent> {
        match self.state {
            BridgeState::Unpaired | BridgeState::Pairing => Some(match &self.qr {
                Some(code) => SessionEvent::PairingCode(code.clone()),
                None => SessionEvent::Unpaired,
            }),
            BridgeState::Authenticated => Some(SessionEvent::Authenticated),
            BridgeState::Connected => Some(SessionEvent::Ready),
            BridgeState::Disconnected => Some(SessionEvent::Disconnected(
                self.reason.clone().unwrap_or_else(|| "disconnected".into()),
            )),
            BridgeState::AuthFailure => Some(SessionEvent::AuthFailure(
                self.reason
                    .clone()
                    .unwrap_or_else(|| "authentication failure".into()),
            )),
            BridgeState::Unknown => None,
        }
    }
}

// -- Client -------------------------------------------------------------------

/// Client for the registration bridge.
#[derive(Debug, Clone)]
pub struct RegistrationBridge {
    http: reqwest::Client,
    base_url: url::Url,
}

impl RegistrationBridge {
    /// Create a bridge client from configuration.
    pub fn new(config: &BridgeConfig) -> Result<Self, ClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| ClientError::Config(ConfigError::InvalidToken))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// The bridge base URL.
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    /// Ask whether a canonical phone number is registered.
    ///
    /// Calls `POST {base_url}/contacts/lookup` with `{"id": "<digits>@c.us"}`.
    pub async fn is_registered(&self, canonical: &str) -> Result<bool, ClientError> {
        let endpoint = "POST /contacts/lookup";
        let url = crate::join_url(&self.base_url, "contacts/lookup");
        let id = format!("{canonical}{CONTACT_SUFFIX}");

        let resp = self
            .http
            .post(&url)
            .json(&LookupRequest { id: &id })
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let body: LookupResponse = crate::read_json(endpoint, resp).await?;
        Ok(body.registered)
    }

    /// Fetch the current session report.
    ///
    /// Calls `GET {base_url}/session`.
    pub async fn session(&self) -> Result<SessionReport, ClientError> {
        let endpoint = "GET /session";
        let url = crate::join_url(&self.base_url, "session");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        crate::read_json(endpoint, resp).await
    }

    /// Restart the bridge session.
    ///
    /// Calls `POST {base_url}/session/reset` with `{"clearSession": bool}`.
    pub async fn reset_session(&self, clear_session: bool) -> Result<(), ClientError> {
        let endpoint = "POST /session/reset";
        let url = crate::join_url(&self.base_url, "session/reset");

        let resp = self
            .http
            .post(&url)
            .json(&ResetRequest { clear_session })
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        crate::ensure_success(endpoint, resp).await?;
        tracing::info!(clear_session, "bridge session reset requested");
        Ok(())
    }
}

#[async_trait]
impl LookupCollaborator for RegistrationBridge {
    type Record = ();

    async fn lookup(&self, canonical: &str) -> Result<Option<()>, LookupError> {
        let registered = self.is_registered(canonical).await?;
        Ok(registered.then_some(()))
    }
}

#[async_trait]
impl SessionController for RegistrationBridge {
    async fn restart(&self, clear_session: bool) -> Result<(), LookupError> {
        Ok(self.reset_session(clear_session).await?)
    }
}
