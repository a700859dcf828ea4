//! # Session Lifecycle
//!
//! Explicit state machine for the registration session, driven by events the
//! collaborator emits (pairing code issued, authenticated, ready, failures).
//!
//! ```text
//!            Unpaired / PairingCode / Authenticated
//! Uninitialized ─────────────────────────────▶ Pairing ──Ready──▶ Ready
//!       │                                        ▲                 │
//!       │     AuthFailure / Disconnected /       │  Unpaired /     │
//!       │             Unreachable                │  PairingCode    │
//!       └──────────────────────────────────▶ Disconnected ◀────────┘
//! ```
//!
//! [`SessionSupervisor`] owns the write side of the [`SessionHandle`]. On
//! `AuthFailure` or `Disconnected` it waits [`RestartPolicy::delay`] and asks
//! the [`SessionController`] to restart with a cleared session, up to
//! [`RestartPolicy::max_attempts`] times until the session is ready again.
//! Events arriving during the delay are applied as they come, and the restart
//! is skipped if the session has left `Disconnected` by the time the delay
//! ends. `Unreachable` (the collaborator itself cannot be contacted) marks
//! the session disconnected but does not trigger a restart.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::LookupError;
use crate::readiness::{SessionHandle, SessionState};

/// Event emitted by the registration collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// No device is paired and no pairing code has been issued yet.
    Unpaired,
    /// A new pairing code is available for a device to scan.
    PairingCode(String),
    /// The device paired; the session is loading.
    Authenticated,
    /// The session is connected and can answer lookups.
    Ready,
    /// The stored credentials were rejected.
    AuthFailure(String),
    /// The session was lost.
    Disconnected(String),
    /// The collaborator could not be contacted.
    Unreachable(String),
}

impl SessionEvent {
    /// Whether this event calls for a supervised restart.
    pub fn requires_restart(&self) -> bool {
        matches!(self, Self::AuthFailure(_) | Self::Disconnected(_))
    }
}

impl SessionState {
    /// Pure transition function.
    pub fn on_event(self, event: &SessionEvent) -> SessionState {
        match event {
            SessionEvent::Unpaired
            | SessionEvent::PairingCode(_)
            | SessionEvent::Authenticated => SessionState::Pairing,
            SessionEvent::Ready => SessionState::Ready,
            SessionEvent::AuthFailure(_)
            | SessionEvent::Disconnected(_)
            | SessionEvent::Unreachable(_) => SessionState::Disconnected,
        }
    }
}

/// Supervised restart policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Wait between a failure and the restart request.
    pub delay: Duration,
    /// Restarts allowed before the session next becomes ready.
    pub max_attempts: u32,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            max_attempts: 5,
        }
    }
}

/// Restarts the collaborator's session.
#[async_trait]
pub trait SessionController: Send + Sync {
    /// Restart the session, discarding stored credentials when `clear_session`.
    async fn restart(&self, clear_session: bool) -> Result<(), LookupError>;
}

/// Applies session events to a [`SessionHandle`] and restarts on failure.
pub struct SessionSupervisor<C: ?Sized> {
    handle: SessionHandle,
    controller: Arc<C>,
    policy: RestartPolicy,
}

impl<C> SessionSupervisor<C>
where
    C: SessionController + ?Sized,
{
    /// Create a supervisor writing to `handle`.
    pub fn new(handle: SessionHandle, controller: Arc<C>, policy: RestartPolicy) -> Self {
        Self {
            handle,
            controller,
            policy,
        }
    }

    /// Consume events until every sender is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<SessionEvent>) {
        tracing::info!("session supervisor started");
        while let Some(event) = events.recv().await {
            self.apply(&event);
            if event.requires_restart() && !self.restart(&mut events).await {
                break;
            }
        }
        tracing::info!("session supervisor stopped");
    }

    /// Apply one event to the shared session state.
    pub fn apply(&self, event: &SessionEvent) {
        let previous = self.handle.state();
        let next = previous.on_event(event);

        self.handle.update(|s| {
            s.state = next;
            match event {
                SessionEvent::PairingCode(code) => s.pairing_code = Some(code.clone()),
                SessionEvent::Unpaired | SessionEvent::Authenticated => s.pairing_code = None,
                SessionEvent::Ready => {
                    s.pairing_code = None;
                    s.last_error = None;
                    s.restarts = 0;
                }
                SessionEvent::AuthFailure(reason)
                | SessionEvent::Disconnected(reason)
                | SessionEvent::Unreachable(reason) => {
                    s.pairing_code = None;
                    s.last_error = Some(reason.clone());
                }
            }
        });

        if previous != next {
            tracing::info!(from = %previous, to = %next, "session state changed");
        }
    }

    /// Schedule a restart after the policy delay.
    ///
    /// Returns `false` once every event sender has been dropped.
    async fn restart(&self, events: &mut mpsc::Receiver<SessionEvent>) -> bool {
        let attempts = self.handle.snapshot().restarts;
        if attempts >= self.policy.max_attempts {
            tracing::error!(
                attempts,
                max_attempts = self.policy.max_attempts,
                "session restart limit reached, waiting for manual reset"
            );
            return true;
        }

        tracing::warn!(
            attempt = attempts + 1,
            delay_secs = self.policy.delay.as_secs(),
            "session lost, restart scheduled"
        );
        let open = self.wait_out_delay(events).await;

        let state = self.handle.state();
        if state != SessionState::Disconnected {
            tracing::info!(state = %state, "session recovered during restart delay, restart skipped");
            return open;
        }

        self.handle.update(|s| s.restarts += 1);
        tracing::warn!(attempt = attempts + 1, "restarting session with cleared credentials");
        if let Err(e) = self.controller.restart(true).await {
            tracing::error!(error = %e, "session restart failed");
            self.handle.update(|s| s.last_error = Some(e.to_string()));
        }
        open
    }

    /// Sleep for the restart delay while still applying incoming events.
    async fn wait_out_delay(&self, events: &mut mpsc::Receiver<SessionEvent>) -> bool {
        let delay = tokio::time::sleep(self.policy.delay);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                () = &mut delay => return true,
                event = events.recv() => match event {
                    Some(event) => self.apply(&event),
                    None => {
                        delay.as_mut().await;
                        return false;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::ReadinessGate;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingController {
        calls: Mutex<Vec<(bool, Instant)>>,
        fail: bool,
    }

    #[async_trait]
    impl SessionController for RecordingController {
        async fn restart(&self, clear_session: bool) -> Result<(), LookupError> {
            self.calls.lock().push((clear_session, Instant::now()));
            if self.fail {
                return Err(LookupError::Unavailable("bridge offline".into()));
            }
            Ok(())
        }
    }

    async fn drive(
        events: Vec<SessionEvent>,
        controller: Arc<RecordingController>,
        policy: RestartPolicy,
    ) -> SessionHandle {
        let handle = SessionHandle::new();
        let (tx, rx) = mpsc::channel(16);
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);
        SessionSupervisor::new(handle.clone(), controller, policy)
            .run(rx)
            .await;
        handle
    }

    fn spawn_supervisor(
        controller: Arc<RecordingController>,
        policy: RestartPolicy,
    ) -> (
        mpsc::Sender<SessionEvent>,
        SessionHandle,
        tokio::task::JoinHandle<()>,
    ) {
        let handle = SessionHandle::new();
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(
            SessionSupervisor::new(handle.clone(), controller, policy).run(rx),
        );
        (tx, handle, task)
    }

    #[test]
    fn transitions_follow_events() {
        let s = SessionState::Uninitialized;
        assert_eq!(s.on_event(&SessionEvent::Unpaired), SessionState::Pairing);
        assert_eq!(SessionState::Ready.on_event(&SessionEvent::Unpaired), SessionState::Pairing);
        assert_eq!(s.on_event(&SessionEvent::PairingCode("x".into())), SessionState::Pairing);
        assert_eq!(s.on_event(&SessionEvent::Authenticated), SessionState::Pairing);
        assert_eq!(SessionState::Pairing.on_event(&SessionEvent::Ready), SessionState::Ready);
        assert_eq!(
            SessionState::Ready.on_event(&SessionEvent::Disconnected("NAVIGATION".into())),
            SessionState::Disconnected
        );
        assert_eq!(
            SessionState::Ready.on_event(&SessionEvent::Unreachable("refused".into())),
            SessionState::Disconnected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pairing_then_ready_makes_session_ready() {
        let controller = Arc::new(RecordingController::default());
        let handle = drive(
            vec![
                SessionEvent::PairingCode("2@abc".into()),
                SessionEvent::Authenticated,
                SessionEvent::Ready,
            ],
            controller.clone(),
            RestartPolicy::default(),
        )
        .await;
        assert!(handle.is_ready());
        assert!(handle.pairing_code().is_none());
        assert!(controller.calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_restarts_with_cleared_session_after_delay() {
        let controller = Arc::new(RecordingController::default());
        let start = Instant::now();
        let handle = drive(
            vec![SessionEvent::AuthFailure("bad credentials".into())],
            controller.clone(),
            RestartPolicy::default(),
        )
        .await;

        let calls = controller.calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0, "restart must clear the stored session");
        assert!(calls[0].1 - start >= Duration::from_secs(10));

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.state, SessionState::Disconnected);
        assert_eq!(snapshot.restarts, 1);
        assert_eq!(snapshot.last_error.as_deref(), Some("bad credentials"));
    }

    #[tokio::test(start_paused = true)]
    async fn restarts_stop_at_the_limit() {
        let controller = Arc::new(RecordingController::default());
        let policy = RestartPolicy {
            delay: Duration::from_secs(1),
            max_attempts: 2,
        };
        let (tx, handle, task) = spawn_supervisor(controller.clone(), policy);
        for reason in ["a", "b", "c"] {
            tx.send(SessionEvent::Disconnected(reason.into())).await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        drop(tx);
        task.await.unwrap();

        assert_eq!(controller.calls.lock().len(), 2);
        assert_eq!(handle.snapshot().restarts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_during_the_delay_share_one_restart() {
        let controller = Arc::new(RecordingController::default());
        let handle = drive(
            vec![
                SessionEvent::Disconnected("a".into()),
                SessionEvent::Disconnected("b".into()),
                SessionEvent::AuthFailure("c".into()),
            ],
            controller.clone(),
            RestartPolicy::default(),
        )
        .await;
        assert_eq!(controller.calls.lock().len(), 1);
        assert_eq!(handle.snapshot().last_error.as_deref(), Some("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn ready_resets_the_attempt_counter() {
        let controller = Arc::new(RecordingController::default());
        let policy = RestartPolicy {
            delay: Duration::from_secs(1),
            max_attempts: 1,
        };
        let (tx, handle, task) = spawn_supervisor(controller.clone(), policy);

        tx.send(SessionEvent::Disconnected("a".into())).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.snapshot().restarts, 1);

        tx.send(SessionEvent::Ready).await.unwrap();
        tx.send(SessionEvent::Disconnected("b".into())).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(tx);
        task.await.unwrap();

        assert_eq!(controller.calls.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn recovery_during_the_delay_skips_the_restart() {
        let controller = Arc::new(RecordingController::default());
        let (tx, handle, task) = spawn_supervisor(controller.clone(), RestartPolicy::default());

        tx.send(SessionEvent::Ready).await.unwrap();
        tx.send(SessionEvent::Disconnected("blip".into())).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!handle.is_ready());

        tx.send(SessionEvent::Ready).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(handle.is_ready(), "ready must apply before the delay ends");

        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(tx);
        task.await.unwrap();

        assert!(controller.calls.lock().is_empty());
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.state, SessionState::Ready);
        assert_eq!(snapshot.restarts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unpaired_after_ready_closes_the_gate() {
        let controller = Arc::new(RecordingController::default());
        let handle = drive(
            vec![SessionEvent::Ready, SessionEvent::Unpaired],
            controller.clone(),
            RestartPolicy::default(),
        )
        .await;
        assert!(!handle.is_ready());
        assert_eq!(handle.state(), SessionState::Pairing);
        assert!(handle.pairing_code().is_none());
        assert!(controller.calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_does_not_restart() {
        let controller = Arc::new(RecordingController::default());
        let handle = drive(
            vec![SessionEvent::Ready, SessionEvent::Unreachable("connection refused".into())],
            controller.clone(),
            RestartPolicy::default(),
        )
        .await;
        assert!(!handle.is_ready());
        assert!(controller.calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_restart_is_recorded() {
        let controller = Arc::new(RecordingController {
            fail: true,
            ..Default::default()
        });
        let handle = drive(
            vec![SessionEvent::Disconnected("lost".into())],
            controller,
            RestartPolicy::default(),
        )
        .await;
        let last_error = handle.snapshot().last_error.unwrap_or_default();
        assert!(last_error.contains("bridge offline"));
    }
}
