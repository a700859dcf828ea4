//! Collaborator client configuration.
//!
//! The registration bridge has no default location and must be configured.
//! The postal client defaults to the public ViaCEP endpoint.

use url::Url;
use zeroize::Zeroizing;

/// Default ViaCEP base URL. Lookups go to `{base}/{cep}/json/`.
pub const DEFAULT_POSTAL_URL: &str = "https://viacep.com.br/ws";

/// Configuration for the registration bridge sidecar.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Base URL of the bridge, e.g. `http://127.0.0.1:8085`.
    pub base_url: Url,
    /// Optional bearer token sent with every request.
    pub api_token: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Interval between session polls, in seconds.
    pub poll_interval_secs: u64,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .finish()
    }
}

impl BridgeConfig {
    /// Configuration with default timeouts and no token.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_token: None,
            timeout_secs: 30,
            poll_interval_secs: 5,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `REGISTRATION_BRIDGE_URL` (required)
    /// - `REGISTRATION_BRIDGE_TOKEN` (optional)
    /// - `REGISTRATION_BRIDGE_TIMEOUT_SECS` (default: 30)
    /// - `SESSION_POLL_INTERVAL_SECS` (default: 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("REGISTRATION_BRIDGE_URL")
            .map_err(|_| ConfigError::MissingBridgeUrl)?;
        let base_url = Url::parse(&raw).map_err(|e| {
            ConfigError::InvalidUrl("REGISTRATION_BRIDGE_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            base_url,
            api_token: std::env::var("REGISTRATION_BRIDGE_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
                .map(Zeroizing::new),
            timeout_secs: env_u64("REGISTRATION_BRIDGE_TIMEOUT_SECS", 30),
            poll_interval_secs: env_u64("SESSION_POLL_INTERVAL_SECS", 5),
        })
    }
}

/// Configuration for the ViaCEP postal service.
#[derive(Debug, Clone)]
pub struct PostalConfig {
    /// Base URL, default <https://viacep.com.br/ws>.
    pub base_url: Url,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl PostalConfig {
    /// Configuration pointing at `base_url` with the default timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout_ms: 5000,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `POSTAL_API_URL` (default: `https://viacep.com.br/ws`)
    /// - `CEP_TIMEOUT` in milliseconds (default: 5000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_url("POSTAL_API_URL", DEFAULT_POSTAL_URL)?,
            timeout_ms: env_u64("CEP_TIMEOUT", 5000),
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("REGISTRATION_BRIDGE_URL environment variable is required")]
    MissingBridgeUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("REGISTRATION_BRIDGE_TOKEN is not a valid header value")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let mut cfg = BridgeConfig::new(Url::parse("http://127.0.0.1:8085").unwrap());
        cfg.api_token = Some(Zeroizing::new("super-secret".into()));
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("NONEXISTENT_VAR_REGCHECK_1", DEFAULT_POSTAL_URL).unwrap();
        assert_eq!(url.as_str(), "https://viacep.com.br/ws");
    }

    #[test]
    fn env_url_rejects_invalid_url() {
        std::env::set_var("TEST_BAD_URL_RC", "not a url");
        let result = env_url("TEST_BAD_URL_RC", DEFAULT_POSTAL_URL);
        std::env::remove_var("TEST_BAD_URL_RC");
        assert!(matches!(result, Err(ConfigError::InvalidUrl(var, _)) if var == "TEST_BAD_URL_RC"));
    }

    #[test]
    fn env_u64_falls_back_on_garbage() {
        std::env::set_var("TEST_BAD_NUM_RC", "ten");
        assert_eq!(env_u64("TEST_BAD_NUM_RC", 7), 7);
        std::env::remove_var("TEST_BAD_NUM_RC");
    }

    #[test]
    fn postal_defaults() {
        let cfg = PostalConfig::new(Url::parse(DEFAULT_POSTAL_URL).unwrap());
        assert_eq!(cfg.timeout_ms, 5000);
    }
}
