//! Session poller.
//!
//! Turns the bridge's `GET /session` report into a stream of
//! [`SessionEvent`]s for the lifecycle supervisor. An event is emitted only
//! when the report changes, and a failed poll produces a single
//! `Unreachable` per outage.

use std::time::Duration;

use regcheck_core::SessionEvent;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::bridge::{BridgeState, RegistrationBridge, SessionReport};

/// Periodically polls the bridge session.
#[derive(Debug, Clone)]
pub struct SessionPoller {
    bridge: RegistrationBridge,
    interval: Duration,
}

impl SessionPoller {
    /// Create a poller that queries `bridge` every `interval`.
    pub fn new(bridge: RegistrationBridge, interval: Duration) -> Self {
        Self { bridge, interval }
    }

    /// Poll until the receiving side of `events` is dropped.
    pub async fn run(self, events: mpsc::Sender<SessionEvent>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tracker = ChangeTracker::default();

        loop {
            ticker.tick().await;
            let observed = self.bridge.session().await.map_err(|e| e.to_string());
            if let Err(reason) = &observed {
                tracing::debug!(error = %reason, "session poll failed");
            }
            if let Some(event) = tracker.observe(observed) {
                if events.send(event).await.is_err() {
                    tracing::debug!("session event receiver closed, poller stopping");
                    return;
                }
            }
        }
    }
}

/// Deduplicates consecutive session observations.
#[derive(Debug, Default)]
pub(crate) struct ChangeTracker {
    last: Option<(BridgeState, Option<String>)>,
    in_outage: bool,
}

impl ChangeTracker {
    pub(crate) fn observe(&mut self, observed: Result<SessionReport, String>) -> Option<SessionEvent> {
        match observed {
            Err(reason) => {
                if self.in_outage {
                    return None;
                }
                self.in_outage = true;
                self.last = None;
                Some(SessionEvent::Unreachable(reason))
            }
            Ok(report) => {
                self.in_outage = false;
                let key = (report.state, report.qr.clone());
                if self.last.as_ref() == Some(&key) {
                    return None;
                }
                self.last = Some(key);
                report.to_event()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(state: BridgeState, qr: Option<&str>) -> Result<SessionReport, String> {
        Ok(SessionReport {
            state,
            qr: qr.map(str::to_string),
            reason: None,
        })
    }

    #[test]
    fn repeated_reports_emit_once() {
        let mut t = ChangeTracker::default();
        assert_eq!(
            t.observe(report(BridgeState::Connected, None)),
            Some(SessionEvent::Ready)
        );
        assert_eq!(t.observe(report(BridgeState::Connected, None)), None);
    }

    #[test]
    fn new_pairing_code_is_a_change() {
        let mut t = ChangeTracker::default();
        assert_eq!(
            t.observe(report(BridgeState::Unpaired, Some("a"))),
            Some(SessionEvent::PairingCode("a".into()))
        );
        assert_eq!(t.observe(report(BridgeState::Unpaired, Some("a"))), None);
        assert_eq!(
            t.observe(report(BridgeState::Unpaired, Some("b"))),
            Some(SessionEvent::PairingCode("b".into()))
        );
    }

    #[test]
    fn logout_without_pairing_code_is_a_change() {
        let mut t = ChangeTracker::default();
        assert_eq!(
            t.observe(report(BridgeState::Connected, None)),
            Some(SessionEvent::Ready)
        );
        assert_eq!(
            t.observe(report(BridgeState::Unpaired, None)),
            Some(SessionEvent::Unpaired)
        );
        assert_eq!(t.observe(report(BridgeState::Unpaired, None)), None);
        assert_eq!(
            t.observe(report(BridgeState::Unpaired, Some("2@abc"))),
            Some(SessionEvent::PairingCode("2@abc".into()))
        );
    }

    #[test]
    fn outage_is_reported_once_and_recovery_re_emits() {
        let mut t = ChangeTracker::default();
        t.observe(report(BridgeState::Connected, None));
        assert_eq!(
            t.observe(Err("connection refused".into())),
            Some(SessionEvent::Unreachable("connection refused".into()))
        );
        assert_eq!(t.observe(Err("connection refused".into())), None);
        assert_eq!(
            t.observe(report(BridgeState::Connected, None)),
            Some(SessionEvent::Ready)
        );
    }
}
