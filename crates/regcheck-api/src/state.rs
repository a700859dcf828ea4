//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! AppState holds only long-lived, process-owned handles:
//! - **Session**: the registration session snapshot, written by the
//!   lifecycle supervisor and read by the readiness gate on every request
//! - **Registration collaborator**: answers "is this number registered?"
//! - **Postal collaborator**: resolves postal codes, when enabled
//! - **Session controller**: restarts the registration session on demand
//!
//! Everything a request produces is request-scoped and never stored here.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regcheck_client::PostalAddress;
use regcheck_core::{
    BatchConfig, LookupCollaborator, NormalizationPolicy, PhoneNormalizer, ReadinessGate,
    RestartPolicy, SessionController, SessionHandle,
};

use crate::auth::ApiKey;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::RateLimitConfig;

/// Registration lookup collaborator.
pub type RegistrationService = Arc<dyn LookupCollaborator<Record = ()>>;

/// Postal lookup collaborator.
pub type PostalService = Arc<dyn LookupCollaborator<Record = PostalAddress>>;

// -- Configuration ------------------------------------------------------------

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format \"{other}\" (expected text or json)")),
        }
    }
}

/// Application configuration.
///
/// Custom `Debug` implementation redacts the API key.
#[derive(Clone)]
pub struct AppConfig {
    /// Interface to bind.
    pub host: IpAddr,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared secret for `/api/*`. If `None`, authentication is disabled.
    pub api_key: Option<ApiKey>,
    /// Largest accepted batch.
    pub max_batch_size: usize,
    /// Concurrency bound within a batch. `None` means the whole batch.
    pub sub_batch_size: Option<usize>,
    /// Region prefix applied to unqualified phone numbers.
    pub default_country_code: String,
    /// Per-item lookup deadline in milliseconds.
    pub operation_timeout_ms: u64,
    pub normalization_policy: NormalizationPolicy,
    /// Mount the postal code routes.
    pub enable_cep: bool,
    /// Comma-separated allowed origins, or `*`.
    pub cors_origin: String,
    pub rate_limit: RateLimitConfig,
    pub restart_policy: RestartPolicy,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_batch_size", &self.max_batch_size)
            .field("sub_batch_size", &self.sub_batch_size)
            .field("default_country_code", &self.default_country_code)
            .field("operation_timeout_ms", &self.operation_timeout_ms)
            .field("normalization_policy", &self.normalization_policy)
            .field("enable_cep", &self.enable_cep)
            .field("cors_origin", &self.cors_origin)
            .field("rate_limit", &self.rate_limit)
            .field("restart_policy", &self.restart_policy)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            api_key: None,
            max_batch_size: 20,
            sub_batch_size: None,
            default_country_code: "55".to_string(),
            operation_timeout_ms: 10_000,
            normalization_policy: NormalizationPolicy::Lenient,
            enable_cep: true,
            cors_origin: "*".to_string(),
            rate_limit: RateLimitConfig::default(),
            restart_policy: RestartPolicy::default(),
            log_format: LogFormat::Text,
        }
    }
}

/// Configuration errors. Each names the offending variable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 3000), `HOST` (default: 0.0.0.0)
    /// - `API_KEY` (optional)
    /// - `MAX_BATCH_SIZE` (default: 20), `SUB_BATCH_SIZE` (default: max)
    /// - `DEFAULT_COUNTRY_CODE` (default: 55)
    /// - `OPERATION_TIMEOUT_MS` (default: 10000)
    /// - `NORMALIZATION_POLICY` (`lenient` | `strict`, default: lenient)
    /// - `ENABLE_CEP` (default: true)
    /// - `CORS_ORIGIN` (default: `*`)
    /// - `RATE_LIMIT_MAX` (default: 100), `RATE_LIMIT_WINDOW_SECS` (default: 900)
    /// - `SESSION_RESTART_DELAY_SECS` (default: 10), `SESSION_MAX_RESTARTS` (default: 5)
    /// - `LOG_FORMAT` (`text` | `json`, default: text)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let max_batch_size: usize = parse_var(&get, "MAX_BATCH_SIZE", defaults.max_batch_size)?;
        if max_batch_size == 0 {
            return Err(invalid("MAX_BATCH_SIZE", "must be at least 1"));
        }
        let sub_batch_size = match get("SUB_BATCH_SIZE") {
            Some(raw) => {
                let n: usize = raw
                    .trim()
                    .parse()
                    .map_err(|e| invalid("SUB_BATCH_SIZE", format!("{e}")))?;
                if n == 0 {
                    return Err(invalid("SUB_BATCH_SIZE", "must be at least 1"));
                }
                Some(n)
            }
            None => None,
        };

        let default_country_code = get("DEFAULT_COUNTRY_CODE")
            .map(|v| v.trim().trim_start_matches('+').to_string())
            .unwrap_or(defaults.default_country_code);
        if default_country_code.is_empty()
            || !default_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("DEFAULT_COUNTRY_CODE", "must be digits"));
        }

        Ok(Self {
            host: parse_var(&get, "HOST", defaults.host)?,
            port: parse_var(&get, "PORT", defaults.port)?,
            api_key: get("API_KEY").map(ApiKey::new),
            max_batch_size,
            sub_batch_size,
            default_country_code,
            operation_timeout_ms: parse_var(
                &get,
                "OPERATION_TIMEOUT_MS",
                defaults.operation_timeout_ms,
            )?,
            normalization_policy: parse_var(
                &get,
                "NORMALIZATION_POLICY",
                defaults.normalization_policy,
            )?,
            enable_cep: parse_var(&get, "ENABLE_CEP", defaults.enable_cep)?,
            cors_origin: get("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            rate_limit: RateLimitConfig {
                max_requests: parse_var(&get, "RATE_LIMIT_MAX", defaults.rate_limit.max_requests)?,
                window_secs: parse_var(
                    &get,
                    "RATE_LIMIT_WINDOW_SECS",
                    defaults.rate_limit.window_secs,
                )?,
            },
            restart_policy: RestartPolicy {
                delay: Duration::from_secs(parse_var(
                    &get,
                    "SESSION_RESTART_DELAY_SECS",
                    defaults.restart_policy.delay.as_secs(),
                )?),
                max_attempts: parse_var(
                    &get,
                    "SESSION_MAX_RESTARTS",
                    defaults.restart_policy.max_attempts,
                )?,
            },
            log_format: parse_var(&get, "LOG_FORMAT", defaults.log_format)?,
        })
    }

    /// Batch limits derived from this configuration.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            max_batch_size: self.max_batch_size,
            sub_batch_size: self.sub_batch_size,
            item_timeout: self.item_timeout(),
        }
    }

    /// Per-item lookup deadline.
    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Phone normalizer with the configured default prefix and policy.
    pub fn phone_normalizer(&self) -> PhoneNormalizer {
        PhoneNormalizer::new(&self.default_country_code, self.normalization_policy)
    }
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(var, e.to_string())),
        None => Ok(default),
    }
}

fn invalid(var: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.into(),
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Registration session, read through [`ReadinessGate`].
    pub session: SessionHandle,
    pub registration: Option<RegistrationService>,
    pub postal: Option<PostalService>,
    pub controller: Option<Arc<dyn SessionController>>,
    pub metrics: ApiMetrics,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a state with no collaborators attached.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            session: SessionHandle::new(),
            registration: None,
            postal: None,
            controller: None,
            metrics: ApiMetrics::new(),
            started_at: Utc::now(),
        }
    }

    /// Attach the registration collaborator.
    pub fn with_registration(mut self, service: RegistrationService) -> Self {
        self.registration = Some(service);
        self
    }

    /// Attach the postal collaborator.
    pub fn with_postal(mut self, service: PostalService) -> Self {
        self.postal = Some(service);
        self
    }

    /// Attach the session controller.
    pub fn with_controller(mut self, controller: Arc<dyn SessionController>) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Share an externally driven session handle.
    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = session;
        self
    }

    /// Registration readiness: a collaborator is attached and the session is
    /// ready. Re-evaluated on every call.
    pub fn registration_ready(&self) -> bool {
        self.registration.is_some() && self.session.is_ready()
    }

    /// Seconds since the process started.
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("session", &self.session.state())
            .field("registration", &self.registration.is_some())
            .field("postal", &self.postal.is_some())
            .field("controller", &self.controller.is_some())
            .field("started_at", &self.started_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = from_map(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.max_batch_size, 20);
        assert_eq!(cfg.sub_batch_size, None);
        assert_eq!(cfg.default_country_code, "55");
        assert_eq!(cfg.operation_timeout_ms, 10_000);
        assert_eq!(cfg.normalization_policy, NormalizationPolicy::Lenient);
        assert!(cfg.enable_cep);
        assert_eq!(cfg.rate_limit.max_requests, 100);
        assert_eq!(cfg.rate_limit.window_secs, 900);
        assert_eq!(cfg.restart_policy.max_attempts, 5);
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = from_map(&[
            ("PORT", "8080"),
            ("MAX_BATCH_SIZE", "1000"),
            ("SUB_BATCH_SIZE", "20"),
            ("DEFAULT_COUNTRY_CODE", "+1"),
            ("NORMALIZATION_POLICY", "Strict"),
            ("ENABLE_CEP", "false"),
            ("LOG_FORMAT", "json"),
            ("API_KEY", "k"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.batch_config().max_batch_size, 1000);
        assert_eq!(cfg.batch_config().effective_sub_batch_size(), 20);
        assert_eq!(cfg.default_country_code, "1");
        assert_eq!(cfg.normalization_policy, NormalizationPolicy::Strict);
        assert!(!cfg.enable_cep);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert!(cfg.api_key.is_some());
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = from_map(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        let err = from_map(&[("MAX_BATCH_SIZE", "0")]).unwrap_err();
        assert!(err.to_string().contains("MAX_BATCH_SIZE"));
        let err = from_map(&[("SUB_BATCH_SIZE", "0")]).unwrap_err();
        assert!(err.to_string().contains("SUB_BATCH_SIZE"));
        let err = from_map(&[("NORMALIZATION_POLICY", "loose")]).unwrap_err();
        assert!(err.to_string().contains("NORMALIZATION_POLICY"));
        let err = from_map(&[("DEFAULT_COUNTRY_CODE", "BR")]).unwrap_err();
        assert!(err.to_string().contains("DEFAULT_COUNTRY_CODE"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = from_map(&[("API_KEY", "hunter2")]).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn registration_not_ready_without_collaborator() {
        let state = AppState::new(AppConfig::default());
        state
            .session
            .update(|s| s.state = regcheck_core::SessionState::Ready);
        assert!(!state.registration_ready());
    }
}
