//! # Readiness Gate
//!
//! The registration session is owned by the host process and outlives every
//! request. [`SessionHandle`] is the single shared view of it: the lifecycle
//! supervisor writes, request handlers read through [`ReadinessGate`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Connection state of the registration session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No event has been observed yet.
    #[default]
    Uninitialized,
    /// The session is waiting for a device to pair, or finishing pairing.
    Pairing,
    /// The session is connected and answering lookups.
    Ready,
    /// The session was lost or rejected.
    Disconnected,
}

impl SessionState {
    /// Lowercase name used in logs and status responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Pairing => "pairing",
            Self::Ready => "ready",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Current state.
    pub state: SessionState,
    /// When the current state was entered.
    pub since: DateTime<Utc>,
    /// Latest pairing code, while pairing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    /// Reason for the most recent failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Restarts attempted since the session was last ready.
    pub restarts: u32,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Uninitialized,
            since: Utc::now(),
            pairing_code: None,
            last_error: None,
            restarts: 0,
        }
    }
}

/// Capability query: is the backing service usable right now?
///
/// Implementations must read live state on every call.
pub trait ReadinessGate: Send + Sync {
    /// Whether lookups may be issued.
    fn is_ready(&self) -> bool;
}

/// Shared, cloneable handle to the registration session state.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<SessionSnapshot>>,
}

impl SessionHandle {
    /// Create a handle in the `Uninitialized` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().clone()
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    /// Latest pairing code, if the session is pairing.
    pub fn pairing_code(&self) -> Option<String> {
        self.inner.read().pairing_code.clone()
    }

    /// Apply a mutation under the write lock.
    ///
    /// `since` is refreshed whenever the state changes.
    pub fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) {
        let mut guard = self.inner.write();
        let before = guard.state;
        f(&mut guard);
        if guard.state != before {
            guard.since = Utc::now();
        }
    }
}

impl ReadinessGate for SessionHandle {
    fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }
}
