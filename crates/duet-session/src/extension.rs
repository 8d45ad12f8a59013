// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-time paid duration extension, synchronised with the partner by a
//! best-effort broadcast.
//!
//! Each client keeps its own [`DurationState`]. The maximum only ever goes
//! up: a remote announcement is applied only when it is strictly larger than
//! the current maximum, which makes duplicated, reordered or echoed
//! announcements harmless. There is no acknowledgement; if the broadcast is
//! lost the partner keeps the shorter limit.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use duet_config::model::ExtensionConfig;
use duet_core::types::ExtensionEvent;
use duet_core::{BackendApi, CallHandle, DuetError, Notice, Notifier, UserId};
use tracing::{debug, info, warn};

use crate::account::AccountCache;
use crate::context::SessionContext;
use crate::lock;

/// Maximum-duration bookkeeping for one call session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationState {
    pub base_duration_secs: u64,
    pub extended_duration_secs: u64,
    pub current_max_secs: u64,
    pub has_extended: bool,
}

impl DurationState {
    pub fn new(base_duration_secs: u64, extended_duration_secs: u64) -> Self {
        Self {
            base_duration_secs,
            extended_duration_secs,
            current_max_secs: base_duration_secs,
            has_extended: false,
        }
    }

    /// Raises the maximum to `to` if that is strictly larger. Never lowers it.
    fn raise(&mut self, to: u64) -> bool {
        if to > self.current_max_secs {
            self.current_max_secs = to;
            true
        } else {
            false
        }
    }
}

/// Why an extension request was refused before any debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoActiveCall,
    AlreadyExtended,
    InProgress,
    InsufficientBalance { balance: u32, required: u32 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NoActiveCall => write!(f, "there is no active call"),
            RejectReason::AlreadyExtended => write!(f, "this call has already been extended"),
            RejectReason::InProgress => write!(f, "an extension is already being processed"),
            RejectReason::InsufficientBalance { balance, required } => write!(
                f,
                "you need at least {required} stars to extend (you have {balance})"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionOutcome {
    Applied { current_max_secs: u64 },
    Rejected(RejectReason),
}

/// Emitted by the duration watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogSignal {
    OneMinuteWarning,
    Expired,
}

struct ProtocolState {
    duration: DurationState,
    request_in_flight: bool,
    partner_notice_shown: bool,
    /// The maximum the last warning was raised for; a raise re-arms it.
    warned_at_max: Option<u64>,
}

/// Clears the in-flight flag however the request ends.
struct InFlight<'a> {
    state: &'a Mutex<ProtocolState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.state).request_in_flight = false;
    }
}

/// Per-session extension protocol and duration watchdog.
///
/// A fresh instance is created for every joined call, which resets the
/// duration state.
pub struct DurationExtensionProtocol {
    self_id: UserId,
    call: Arc<dyn CallHandle>,
    backend: Arc<dyn BackendApi>,
    account: Arc<AccountCache>,
    notifier: Arc<dyn Notifier>,
    config: ExtensionConfig,
    warning_lead: Duration,
    state: Mutex<ProtocolState>,
}

impl DurationExtensionProtocol {
    pub fn new(ctx: &SessionContext, call: Arc<dyn CallHandle>, account: Arc<AccountCache>) -> Self {
        let config = ctx.config.extension.clone();
        let duration =
            DurationState::new(config.base_duration_secs, config.extended_duration_secs);
        Self {
            self_id: ctx.self_id.clone(),
            call,
            backend: ctx.backend.clone(),
            account,
            notifier: ctx.notifier.clone(),
            warning_lead: Duration::from_secs(ctx.config.call.warning_lead_secs),
            config,
            state: Mutex::new(ProtocolState {
                duration,
                request_in_flight: false,
                partner_notice_shown: false,
                warned_at_max: None,
            }),
        }
    }

    /// Current maximum call duration in seconds.
    pub fn current_max(&self) -> u64 {
        lock(&self.state).duration.current_max_secs
    }

    pub fn duration_state(&self) -> DurationState {
        lock(&self.state).duration.clone()
    }

    /// Pays for and applies the one allowed extension.
    ///
    /// The debit happens first; only once it succeeds is the local maximum
    /// raised and the announcement broadcast. A failed broadcast does not
    /// undo the local raise.
    pub async fn request_extension(&self) -> Result<ExtensionOutcome, DuetError> {
        let _in_flight = match self.begin_request() {
            Ok(guard) => guard,
            Err(reason) => return Ok(self.reject(reason)),
        };

        let required = self.config.min_balance_stars;
        let balance = match self.account.stars().await {
            Ok(balance) => balance,
            Err(e) => return Err(self.fail(e)),
        };
        if balance < required {
            return Ok(self.reject(RejectReason::InsufficientBalance { balance, required }));
        }

        if let Err(e) = self.backend.decrease_stars(self.config.cost_stars).await {
            return Err(self.fail(e));
        }
        self.account.debit(self.config.cost_stars).await;

        let target = self.config.extended_duration_secs;
        let (raised, current_max_secs) = {
            let mut state = lock(&self.state);
            state.duration.has_extended = true;
            let raised = state.duration.raise(target);
            (raised, state.duration.current_max_secs)
        };

        if raised {
            info!(current_max_secs, "call extended");
            self.notifier.notify(Notice::CallExtended {
                extended_duration_seconds: target,
            });
        } else {
            debug!(current_max_secs, "partner's extension already applied");
        }

        let event = ExtensionEvent::new(target, self.self_id.clone(), Utc::now());
        if let Err(e) = self.call.send_custom_event(event.to_payload()).await {
            warn!(error = %e, "extension broadcast failed, partner keeps the shorter limit");
        }

        Ok(ExtensionOutcome::Applied { current_max_secs })
    }

    /// Reconciles a partner's announcement. Returns true if it raised the maximum.
    pub fn on_remote_extension(&self, event: &ExtensionEvent) -> bool {
        if event.extended_by == self.self_id {
            debug!("ignoring echo of own extension");
            return false;
        }

        let show_notice = {
            let mut state = lock(&self.state);
            if !state.duration.raise(event.extended_duration_seconds) {
                debug!(
                    announced = event.extended_duration_seconds,
                    current = state.duration.current_max_secs,
                    "stale extension announcement ignored"
                );
                return false;
            }
            state.duration.has_extended = true;
            !std::mem::replace(&mut state.partner_notice_shown, true)
        };

        info!(
            current_max_secs = event.extended_duration_seconds,
            peer = %event.extended_by,
            "partner extended the call"
        );
        if show_notice {
            self.notifier.notify(Notice::PartnerExtended {
                extended_duration_seconds: event.extended_duration_seconds,
            });
        }
        true
    }

    /// Compares elapsed call time against the current maximum.
    ///
    /// Warns once per maximum at `max - warning_lead`, and reports expiry at
    /// or after `max`.
    pub fn check(&self, elapsed: Duration) -> Option<WatchdogSignal> {
        let mut state = lock(&self.state);
        let max = state.duration.current_max_secs;
        if elapsed >= Duration::from_secs(max) {
            return Some(WatchdogSignal::Expired);
        }

        let warn_at = Duration::from_secs(max).saturating_sub(self.warning_lead);
        if elapsed >= warn_at && state.warned_at_max != Some(max) {
            state.warned_at_max = Some(max);
            return Some(WatchdogSignal::OneMinuteWarning);
        }
        None
    }

    fn begin_request(&self) -> Result<InFlight<'_>, RejectReason> {
        let mut state = lock(&self.state);
        if state.duration.has_extended {
            return Err(RejectReason::AlreadyExtended);
        }
        if state.request_in_flight {
            return Err(RejectReason::InProgress);
        }
        state.request_in_flight = true;
        Ok(InFlight { state: &self.state })
    }

    fn reject(&self, reason: RejectReason) -> ExtensionOutcome {
        info!(%reason, "extension rejected");
        self.notifier.notify(Notice::ExtensionFailed {
            reason: reason.to_string(),
        });
        ExtensionOutcome::Rejected(reason)
    }

    fn fail(&self, error: DuetError) -> DuetError {
        warn!(error = %error, "extension failed, duration unchanged");
        let reason = match &error {
            DuetError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        };
        self.notifier.notify(Notice::ExtensionFailed { reason });
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::CallId;
    use duet_test_utils::{MockCall, TestHarness};
    use tracing_test::traced_test;

    struct Fixture {
        harness: TestHarness,
        call: Arc<MockCall>,
        protocol: DurationExtensionProtocol,
    }

    fn fixture(stars: u32) -> Fixture {
        let harness = TestHarness::builder()
            .with_self_id("alice")
            .with_stars(stars)
            .build();
        let ctx = SessionContext::from_harness(&harness);
        let call = harness.platform.mock_call("call-1");
        let account = Arc::new(AccountCache::new(ctx.backend.clone()));
        let protocol = DurationExtensionProtocol::new(
            &ctx,
            ctx.platform.call(&CallId::from("call-1")),
            account,
        );
        Fixture {
            harness,
            call,
            protocol,
        }
    }

    fn remote(seconds: u64, by: &str) -> ExtensionEvent {
        ExtensionEvent::new(seconds, UserId::from(by), Utc::now())
    }

    fn extended_notices(f: &Fixture) -> usize {
        f.harness.notifier.count(|n| {
            matches!(
                n,
                Notice::CallExtended { .. } | Notice::PartnerExtended { .. }
            )
        })
    }

    #[tokio::test]
    async fn local_extension_debits_then_raises_and_broadcasts() {
        let f = fixture(25);

        let outcome = f.protocol.request_extension().await.unwrap();

        assert_eq!(
            outcome,
            ExtensionOutcome::Applied {
                current_max_secs: 600
            }
        );
        assert_eq!(f.harness.backend.decrease_calls(), vec![10]);
        let sent = f.call.sent_events();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["type"], "extend_call_duration");
        assert_eq!(sent[0]["extendedDurationSeconds"], 600);
        assert_eq!(sent[0]["extendedBy"], "alice");
        assert_eq!(
            f.harness.notifier.notices(),
            vec![Notice::CallExtended {
                extended_duration_seconds: 600
            }]
        );
    }

    #[tokio::test]
    async fn second_request_is_rejected_without_debit() {
        let f = fixture(100);
        f.protocol.request_extension().await.unwrap();

        let again = f.protocol.request_extension().await.unwrap();

        assert_eq!(
            again,
            ExtensionOutcome::Rejected(RejectReason::AlreadyExtended)
        );
        assert_eq!(f.harness.backend.decrease_calls().len(), 1);
        assert_eq!(f.protocol.current_max(), 600);
    }

    #[tokio::test]
    async fn insufficient_balance_is_rejected_before_debit() {
        let f = fixture(5);

        let outcome = f.protocol.request_extension().await.unwrap();

        assert_eq!(
            outcome,
            ExtensionOutcome::Rejected(RejectReason::InsufficientBalance {
                balance: 5,
                required: 10
            })
        );
        assert!(f.harness.backend.decrease_calls().is_empty());
        assert_eq!(f.protocol.current_max(), 300);
    }

    #[tokio::test]
    async fn failed_debit_leaves_duration_untouched_and_allows_retry() {
        let f = fixture(50);
        f.harness.backend.push_decrease(Err(DuetError::Backend {
            status: Some(400),
            message: "Insufficient stars".into(),
        }));

        assert!(f.protocol.request_extension().await.is_err());
        assert_eq!(f.protocol.current_max(), 300);
        assert!(!f.protocol.duration_state().has_extended);
        assert!(f.call.sent_events().is_empty());
        assert_eq!(
            f.harness.notifier.notices(),
            vec![Notice::ExtensionFailed {
                reason: "Insufficient stars".into()
            }]
        );

        let retry = f.protocol.request_extension().await.unwrap();
        assert!(matches!(retry, ExtensionOutcome::Applied { .. }));
    }

    #[traced_test]
    #[tokio::test]
    async fn broadcast_failure_keeps_local_raise() {
        let f = fixture(50);
        f.call.fail_sends();

        let outcome = f.protocol.request_extension().await.unwrap();

        assert!(matches!(outcome, ExtensionOutcome::Applied { .. }));
        assert_eq!(f.protocol.current_max(), 600);
        assert!(logs_contain("extension broadcast failed"));
    }

    #[test]
    fn remote_at_or_below_current_is_a_noop() {
        let f = fixture(0);
        assert!(!f.protocol.on_remote_extension(&remote(300, "bob")));
        assert!(!f.protocol.on_remote_extension(&remote(120, "bob")));
        assert_eq!(f.protocol.current_max(), 300);
        assert_eq!(extended_notices(&f), 0);
    }

    #[test]
    fn remote_raise_applies_once_with_one_notice() {
        let f = fixture(0);
        assert!(f.protocol.on_remote_extension(&remote(600, "bob")));
        assert!(!f.protocol.on_remote_extension(&remote(600, "bob")));
        assert_eq!(f.protocol.current_max(), 600);
        assert_eq!(
            f.harness.notifier.notices(),
            vec![Notice::PartnerExtended {
                extended_duration_seconds: 600
            }]
        );
    }

    #[test]
    fn own_echo_is_ignored() {
        let f = fixture(0);
        assert!(!f.protocol.on_remote_extension(&remote(600, "alice")));
        assert_eq!(f.protocol.current_max(), 300);
    }

    #[tokio::test]
    async fn remote_extension_consumes_the_one_raise() {
        let f = fixture(100);
        f.protocol.on_remote_extension(&remote(600, "bob"));

        let outcome = f.protocol.request_extension().await.unwrap();

        assert_eq!(
            outcome,
            ExtensionOutcome::Rejected(RejectReason::AlreadyExtended)
        );
        assert!(f.harness.backend.decrease_calls().is_empty());
    }

    #[tokio::test]
    async fn near_simultaneous_extensions_raise_once_with_one_notice() {
        let f = fixture(100);

        f.protocol.request_extension().await.unwrap();
        let applied = f.protocol.on_remote_extension(&remote(600, "bob"));

        assert!(!applied);
        assert_eq!(f.protocol.current_max(), 600);
        assert_eq!(extended_notices(&f), 1);
    }

    #[test]
    fn watchdog_warns_then_expires_at_the_boundaries() {
        let f = fixture(0);
        let at = Duration::from_secs;

        assert_eq!(f.protocol.check(at(239)), None);
        assert_eq!(
            f.protocol.check(at(240)),
            Some(WatchdogSignal::OneMinuteWarning)
        );
        assert_eq!(f.protocol.check(at(241)), None);
        assert_eq!(f.protocol.check(at(299)), None);
        assert_eq!(f.protocol.check(at(300)), Some(WatchdogSignal::Expired));
    }

    #[test]
    fn watchdog_rearms_warning_after_extension() {
        let f = fixture(0);
        let at = Duration::from_secs;

        assert_eq!(
            f.protocol.check(at(250)),
            Some(WatchdogSignal::OneMinuteWarning)
        );
        f.protocol.on_remote_extension(&remote(600, "bob"));

        assert_eq!(f.protocol.check(at(300)), None);
        assert_eq!(f.protocol.check(at(539)), None);
        assert_eq!(
            f.protocol.check(at(540)),
            Some(WatchdogSignal::OneMinuteWarning)
        );
        assert_eq!(f.protocol.check(at(600)), Some(WatchdogSignal::Expired));
    }
}
