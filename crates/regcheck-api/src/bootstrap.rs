//! # Service Bootstrap
//!
//! Builds the collaborators from the environment and attaches them to the
//! application state.
//!
//! ## Bootstrap Sequence
//!
//! 1. **Registration bridge**: from `REGISTRATION_BRIDGE_URL`. When unset,
//!    the server starts without it and registration checks return 503.
//! 2. **Session lifecycle**: a [`SessionPoller`] feeds bridge reports into a
//!    [`SessionSupervisor`], which owns the session state read by the
//!    readiness gate and restarts the bridge session on failure.
//! 3. **Postal client**: when postal validation is enabled, from
//!    `POSTAL_API_URL` (defaults to the public ViaCEP endpoint).

use std::sync::Arc;
use std::time::Duration;

use regcheck_client::{
    BridgeConfig, ClientError, ConfigError as ClientConfigError, PostalConfig,
    RegistrationBridge, SessionPoller, ViaCepClient,
};
use regcheck_core::{SessionEvent, SessionSupervisor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::state::{AppConfig, AppState};

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Errors during bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Collaborator configuration present but invalid.
    #[error("client configuration error: {0}")]
    Config(#[from] ClientConfigError),

    /// Collaborator client could not be constructed.
    #[error("client initialization failed: {0}")]
    Client(#[from] ClientError),
}

/// Application state plus the background lifecycle tasks.
#[derive(Debug)]
pub struct Bootstrapped {
    pub state: AppState,
    /// Poller and supervisor tasks. Empty when no bridge is configured.
    pub tasks: Vec<JoinHandle<()>>,
}

/// Build the application state from configuration and the environment.
///
/// Must be called within a Tokio runtime: the session lifecycle tasks are
/// spawned here.
pub fn bootstrap(config: AppConfig) -> Result<Bootstrapped, BootstrapError> {
    let bridge_config = match BridgeConfig::from_env() {
        Ok(cfg) => Some(cfg),
        Err(ClientConfigError::MissingBridgeUrl) => {
            tracing::warn!(
                "registration bridge not configured: REGISTRATION_BRIDGE_URL is unset. \
                 Registration endpoints will return 503."
            );
            None
        }
        Err(e) => return Err(e.into()),
    };
    let postal_config = if config.enable_cep {
        Some(PostalConfig::from_env()?)
    } else {
        tracing::info!("postal validation disabled");
        None
    };

    assemble(config, bridge_config, postal_config)
}

/// Build the application state from explicit collaborator configuration.
pub fn assemble(
    config: AppConfig,
    bridge_config: Option<BridgeConfig>,
    postal_config: Option<PostalConfig>,
) -> Result<Bootstrapped, BootstrapError> {
    let restart_policy = config.restart_policy;
    let mut state = AppState::new(config);
    let mut tasks = Vec::new();

    if let Some(cfg) = bridge_config {
        let bridge = RegistrationBridge::new(&cfg)?;
        tracing::info!(base_url = %bridge.base_url(), "registration bridge configured");

        let (tx, rx) = mpsc::channel::<SessionEvent>(EVENT_CHANNEL_CAPACITY);
        let poller = SessionPoller::new(bridge.clone(), Duration::from_secs(cfg.poll_interval_secs));
        let bridge = Arc::new(bridge);
        let supervisor =
            SessionSupervisor::new(state.session.clone(), bridge.clone(), restart_policy);

        tasks.push(tokio::spawn(poller.run(tx)));
        tasks.push(tokio::spawn(supervisor.run(rx)));

        state = state
            .with_registration(bridge.clone())
            .with_controller(bridge);
    }

    if let Some(cfg) = postal_config {
        let client = ViaCepClient::new(&cfg)?;
        tracing::info!(base_url = %cfg.base_url, timeout_ms = cfg.timeout_ms, "postal client configured");
        state = state.with_postal(Arc::new(client));
    }

    Ok(Bootstrapped { state, tasks })
}
