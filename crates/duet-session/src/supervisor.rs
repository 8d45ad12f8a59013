// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session supervisor: watches platform events and the duration clock
//! until something ends the call.
//!
//! The supervisor never tears the call down itself. It returns the
//! [`EndReason`] and leaves teardown to the lifecycle controller, so a user
//! pressing end during a debounce wins and the supervisor simply stops.

use std::sync::Arc;
use std::time::Duration;

use duet_config::model::CallConfig;
use duet_core::types::{CallEvent, ExtensionEvent};
use duet_core::{CallingState, Notice, Notifier, UserId};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::disconnect::DisconnectDetector;
use crate::extension::{DurationExtensionProtocol, WatchdogSignal};
use crate::lifecycle::{ActiveCall, EndReason};

pub struct CallSupervisor {
    active: ActiveCall,
    protocol: Arc<DurationExtensionProtocol>,
    notifier: Arc<dyn Notifier>,
    detector: DisconnectDetector,
    config: CallConfig,
}

impl CallSupervisor {
    pub fn new(
        self_id: UserId,
        active: ActiveCall,
        protocol: Arc<DurationExtensionProtocol>,
        notifier: Arc<dyn Notifier>,
        config: CallConfig,
    ) -> Self {
        Self {
            active,
            protocol,
            notifier,
            detector: DisconnectDetector::new(self_id),
            config,
        }
    }

    /// Runs until a termination trigger fires, returning why the call should
    /// end, or `None` if the session was torn down from elsewhere.
    pub async fn run(mut self) -> Option<EndReason> {
        let cancel = self.active.cancel.clone();
        let mut events = self.active.call.subscribe();

        let tick = self.config.tick_interval();
        let mut ticker = tokio::time::interval_at(self.active.joined_at + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Participants that arrived before subscribing.
        let snapshot = self.active.call.participants();
        self.detector.observe(&snapshot);

        debug!(call_id = %self.active.call_id, "supervising call");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("supervisor cancelled by teardown");
                    return None;
                }
                event = events.recv() => {
                    if let Some(reason) = self.on_event(event).await {
                        return reason;
                    }
                }
                now = ticker.tick() => {
                    if let Some(reason) = self.on_tick(now).await {
                        return reason;
                    }
                }
            }
        }
    }

    /// `Some(outcome)` ends the loop with that outcome.
    async fn on_event(
        &mut self,
        event: Result<CallEvent, RecvError>,
    ) -> Option<Option<EndReason>> {
        match event {
            Ok(CallEvent::Participants(participants)) => {
                self.observe_participants(&participants).await
            }
            Ok(CallEvent::CallingState(CallingState::Left)) => {
                info!("call moved to left");
                Some(
                    self.linger(self.config.call_left_debounce(), EndReason::CallLeft)
                        .await,
                )
            }
            Ok(CallEvent::CallingState(state)) => {
                debug!(%state, "calling state changed");
                None
            }
            Ok(CallEvent::Custom(payload)) => {
                match ExtensionEvent::from_custom(&payload) {
                    Some(extension) => {
                        self.protocol.on_remote_extension(&extension);
                    }
                    None => debug!("ignoring unknown custom event"),
                }
                None
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "call events lagged, resyncing participants");
                let participants = self.active.call.participants();
                self.observe_participants(&participants).await
            }
            Err(RecvError::Closed) => {
                warn!("call event stream closed");
                Some(Some(EndReason::CallLeft))
            }
        }
    }

    async fn observe_participants(
        &mut self,
        participants: &[duet_core::types::Participant],
    ) -> Option<Option<EndReason>> {
        if self.active.call.calling_state() != CallingState::Joined {
            return None;
        }
        let signal = self.detector.observe(participants)?;
        info!(peer = ?signal.peer_id, "partner left the call");
        self.notifier.notify(Notice::PartnerLeft);
        let reason = self
            .linger(self.config.peer_left_debounce(), EndReason::PeerLeft)
            .await;
        if reason.is_some() && self.partner_returned() {
            info!(peer = ?signal.peer_id, "partner back before debounce ended, resuming");
            return None;
        }
        Some(reason)
    }

    /// Re-reads the participant list after a debounce.
    fn partner_returned(&mut self) -> bool {
        let participants = self.active.call.participants();
        self.detector.observe(&participants);
        self.detector.has_seen_partner()
    }

    async fn on_tick(&self, now: Instant) -> Option<Option<EndReason>> {
        let elapsed = now.saturating_duration_since(self.active.joined_at);
        match self.protocol.check(elapsed)? {
            WatchdogSignal::OneMinuteWarning => {
                info!(elapsed_secs = elapsed.as_secs(), "one minute remaining");
                self.notifier.notify(Notice::OneMinuteRemaining);
                None
            }
            WatchdogSignal::Expired => {
                info!(
                    elapsed_secs = elapsed.as_secs(),
                    max_secs = self.protocol.current_max(),
                    "maximum call duration reached"
                );
                self.notifier.notify(Notice::TimesUp);
                Some(
                    self.linger(self.config.times_up_notice(), EndReason::TimeUp)
                        .await,
                )
            }
        }
    }

    /// Waits out a debounce unless teardown starts elsewhere first.
    async fn linger(&self, delay: Duration, reason: EndReason) -> Option<EndReason> {
        tokio::select! {
            biased;
            _ = self.active.cancel.cancelled() => None,
            _ = tokio::time::sleep(delay) => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountCache;
    use crate::context::SessionContext;
    use crate::lifecycle::CallLifecycleController;
    use crate::moderation::ModerationGate;
    use chrono::Utc;
    use duet_core::CallId;
    use duet_test_utils::{MockCall, TestHarness};

    struct Fixture {
        harness: TestHarness,
        call: Arc<MockCall>,
        controller: Arc<CallLifecycleController>,
        supervisor: CallSupervisor,
    }

    async fn fixture() -> Fixture {
        let harness = TestHarness::builder().with_self_id("alice").build();
        let ctx = SessionContext::from_harness(&harness);
        let call = harness.platform.mock_call("c1");
        let account = Arc::new(AccountCache::new(ctx.backend.clone()));
        let moderation = Arc::new(ModerationGate::new(
            ctx.backend.clone(),
            ctx.notifier.clone(),
            ctx.config.moderation.report_limit,
        ));
        let controller = Arc::new(CallLifecycleController::new(
            ctx.clone(),
            account.clone(),
            moderation,
        ));
        controller.join(&CallId::from("c1")).await.unwrap();
        let active = controller.active_call().unwrap();
        let protocol = Arc::new(DurationExtensionProtocol::new(
            &ctx,
            active.call.clone(),
            account,
        ));
        let supervisor = CallSupervisor::new(
            ctx.self_id.clone(),
            active,
            protocol,
            ctx.notifier.clone(),
            ctx.config.call.clone(),
        );
        Fixture {
            harness,
            call,
            controller,
            supervisor,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_warns_at_four_minutes_and_ends_after_notice() {
        let f = fixture().await;
        let start = Instant::now();

        let reason = f.supervisor.run().await;

        assert_eq!(reason, Some(EndReason::TimeUp));
        let warned = f
            .harness
            .notifier
            .first_at(|n| *n == Notice::OneMinuteRemaining)
            .unwrap();
        let times_up = f.harness.notifier.first_at(|n| *n == Notice::TimesUp).unwrap();
        assert_eq!(warned - start, Duration::from_secs(240));
        assert_eq!(times_up - start, Duration::from_secs(300));
        assert_eq!(Instant::now() - start, Duration::from_secs(303));
    }

    #[tokio::test(start_paused = true)]
    async fn partner_leaving_ends_after_debounce() {
        let f = fixture().await;
        let call = f.call.clone();
        let start = Instant::now();
        let handle = tokio::spawn(f.supervisor.run());

        tokio::time::sleep(Duration::from_secs(10)).await;
        call.peer_joins("bob");
        tokio::time::sleep(Duration::from_secs(10)).await;
        call.peer_leaves();

        assert_eq!(handle.await.unwrap(), Some(EndReason::PeerLeft));
        assert_eq!(f.harness.notifier.count(|n| *n == Notice::PartnerLeft), 1);
        assert_eq!(Instant::now() - start, Duration::from_secs(22));
    }

    #[tokio::test(start_paused = true)]
    async fn partner_back_within_debounce_keeps_call() {
        let f = fixture().await;
        let call = f.call.clone();
        let start = Instant::now();
        let handle = tokio::spawn(f.supervisor.run());

        tokio::time::sleep(Duration::from_secs(10)).await;
        call.peer_joins("bob");
        tokio::time::sleep(Duration::from_secs(10)).await;
        call.peer_leaves();
        tokio::time::sleep(Duration::from_secs(1)).await;
        call.peer_joins("bob");
        tokio::time::sleep(Duration::from_secs(9)).await;

        assert!(!handle.is_finished());
        assert_eq!(call.end_call_count(), 0);

        call.peer_leaves();
        assert_eq!(handle.await.unwrap(), Some(EndReason::PeerLeft));
        assert_eq!(Instant::now() - start, Duration::from_secs(32));
        assert_eq!(f.harness.notifier.count(|n| *n == Notice::PartnerLeft), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn lone_participant_before_partner_is_not_a_disconnect() {
        let f = fixture().await;
        let call = f.call.clone();
        let handle = tokio::spawn(f.supervisor.run());

        tokio::time::sleep(Duration::from_secs(5)).await;
        call.peer_leaves();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!handle.is_finished());
        assert_eq!(f.harness.notifier.count(|n| *n == Notice::PartnerLeft), 0);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn user_end_during_debounce_stops_supervisor() {
        let f = fixture().await;
        let call = f.call.clone();
        let controller = f.controller.clone();
        let handle = tokio::spawn(f.supervisor.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        call.peer_joins("bob");
        tokio::time::sleep(Duration::from_secs(1)).await;
        call.peer_leaves();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(controller.end_call(EndReason::User).await.is_some());
        assert_eq!(handle.await.unwrap(), None);
        assert_eq!(call.end_call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_extension_moves_expiry() {
        let f = fixture().await;
        let call = f.call.clone();
        let start = Instant::now();
        let handle = tokio::spawn(f.supervisor.run());

        tokio::time::sleep(Duration::from_secs(100)).await;
        call.deliver_custom(
            ExtensionEvent::new(600, UserId::from("bob"), Utc::now()).to_payload(),
        );
        call.deliver_custom(serde_json::json!({"type": "reaction", "emoji": "wave"}));

        assert_eq!(handle.await.unwrap(), Some(EndReason::TimeUp));
        let times_up = f.harness.notifier.first_at(|n| *n == Notice::TimesUp).unwrap();
        assert_eq!(times_up - start, Duration::from_secs(600));
        assert_eq!(
            f.harness
                .notifier
                .count(|n| matches!(n, Notice::PartnerExtended { .. })),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn call_left_ends_after_short_debounce() {
        let f = fixture().await;
        let call = f.call.clone();
        let start = Instant::now();
        let handle = tokio::spawn(f.supervisor.run());

        tokio::time::sleep(Duration::from_secs(30)).await;
        call.set_calling_state(CallingState::Left);

        assert_eq!(handle.await.unwrap(), Some(EndReason::CallLeft));
        assert_eq!(Instant::now() - start, Duration::from_secs(31));
    }
}
