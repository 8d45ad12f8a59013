// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Join and teardown of one calling-platform session.
//!
//! Joins are deduplicated per call id by a latch that is only cleared on a
//! failed join or replaced when a different call id arrives. Every way a
//! session can end funnels into [`CallLifecycleController::end_call`], which
//! runs at most one teardown at a time: penalty check and moderation check
//! happen in that order before the user is released.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use duet_core::{CallHandle, CallId, CallingState, DuetError, Notice, PlatformErrorKind};
use strum::Display;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::account::AccountCache;
use crate::context::SessionContext;
use crate::display::ban_countdown;
use crate::lock;
use crate::moderation::{ModerationAction, ModerationCheck, ModerationGate};
use crate::penalty::{PenaltyCalculator, PenaltyRecord};

/// Result of a successful [`CallLifecycleController::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    /// This client joined the session.
    Joined,
    /// The platform already had this client in the session.
    AlreadyJoined,
    /// A join for the same call id was already made; nothing was done.
    Duplicate,
}

/// What triggered a teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EndReason {
    /// The user pressed end.
    User,
    /// The partner disconnected.
    PeerLeft,
    /// The platform moved the whole call to `left`.
    CallLeft,
    /// The maximum duration was reached.
    TimeUp,
    /// The process is shutting down.
    Shutdown,
}

/// Where the UI goes once teardown completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Home,
    /// A blocking ban notice is up; wait for the user to dismiss it.
    AwaitAcknowledgement,
}

#[derive(Debug, Clone)]
pub struct TeardownReport {
    pub reason: EndReason,
    pub penalty: PenaltyRecord,
    /// `None` when the ban-status fetch failed.
    pub moderation: Option<ModerationCheck>,
    pub release: Release,
}

/// Handle on the session currently joined.
#[derive(Clone)]
pub struct ActiveCall {
    pub call_id: CallId,
    pub call: Arc<dyn CallHandle>,
    pub joined_at: Instant,
    /// Cancelled at the start of teardown; stops the supervisor and any
    /// pending debounce.
    pub cancel: CancellationToken,
    report: watch::Receiver<Option<TeardownReport>>,
}

impl ActiveCall {
    /// Waits for this session's teardown and returns its report.
    ///
    /// `None` if the teardown was abandoned before completing.
    pub async fn teardown_report(&self) -> Option<TeardownReport> {
        let mut report = self.report.clone();
        let done = report.wait_for(Option::is_some).await.ok();
        done.and_then(|r| (*r).clone())
    }
}

/// The joined session plus the sender its teardown report goes to.
struct Session {
    active: ActiveCall,
    report_tx: watch::Sender<Option<TeardownReport>>,
}

impl std::fmt::Debug for ActiveCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveCall")
            .field("call_id", &self.call_id)
            .field("joined_at", &self.joined_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TeardownState {
    Idle,
    InProgress,
}

/// Resets the teardown state however the teardown ends.
struct TeardownGuard<'a> {
    state: &'a Mutex<TeardownState>,
}

impl Drop for TeardownGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = TeardownState::Idle;
    }
}

pub struct CallLifecycleController {
    ctx: SessionContext,
    account: Arc<AccountCache>,
    moderation: Arc<ModerationGate>,
    penalty: PenaltyCalculator,
    join_latch: Mutex<Option<CallId>>,
    teardown: Mutex<TeardownState>,
    active: Mutex<Option<Session>>,
    report_baseline: AtomicU32,
}

impl CallLifecycleController {
    pub fn new(
        ctx: SessionContext,
        account: Arc<AccountCache>,
        moderation: Arc<ModerationGate>,
    ) -> Self {
        let penalty = PenaltyCalculator::new(ctx.config.call.penalty_threshold());
        Self {
            ctx,
            account,
            moderation,
            penalty,
            join_latch: Mutex::new(None),
            teardown: Mutex::new(TeardownState::Idle),
            active: Mutex::new(None),
            report_baseline: AtomicU32::new(0),
        }
    }

    pub fn active_call(&self) -> Option<ActiveCall> {
        lock(&self.active).as_ref().map(|s| s.active.clone())
    }

    pub fn teardown_state(&self) -> TeardownState {
        *lock(&self.teardown)
    }

    /// Last report count observed by the moderation check.
    pub fn report_baseline(&self) -> u32 {
        self.report_baseline.load(Ordering::SeqCst)
    }

    pub fn prime_baseline(&self, report_count: u32) {
        self.report_baseline.store(report_count, Ordering::SeqCst);
    }

    /// Joins the platform session for `call_id`.
    ///
    /// A repeated join for the call id already latched is a no-op. A
    /// transient failure is retried once after the configured delay; a
    /// second failure surfaces a connection notice and clears the latch so
    /// the user can try again.
    pub async fn join(&self, call_id: &CallId) -> Result<JoinResult, DuetError> {
        {
            let mut latch = lock(&self.join_latch);
            if latch.as_ref() == Some(call_id) {
                debug!(%call_id, "duplicate join ignored");
                return Ok(JoinResult::Duplicate);
            }
            *latch = Some(call_id.clone());
        }

        let call = self.ctx.platform.call(call_id);
        let result = match call.calling_state() {
            CallingState::Joined => {
                debug!(%call_id, "session already joined, skipping join");
                Ok(JoinResult::AlreadyJoined)
            }
            CallingState::Left => Err(DuetError::platform(
                PlatformErrorKind::Other,
                "call has already ended",
            )),
            _ => self.join_with_retry(call.as_ref()).await,
        };

        let joined = match result {
            Ok(joined) => joined,
            Err(e) => {
                error!(%call_id, error = %e, "joining call failed");
                *lock(&self.join_latch) = None;
                self.ctx.notifier.notify(Notice::ConnectionFailed);
                return Err(e);
            }
        };

        if let Err(e) = call.disable_camera().await {
            warn!(%call_id, error = %e, "disabling camera failed");
        }

        let (report_tx, report) = watch::channel(None);
        let session = Session {
            active: ActiveCall {
                call_id: call_id.clone(),
                call,
                joined_at: Instant::now(),
                cancel: CancellationToken::new(),
                report,
            },
            report_tx,
        };
        if let Some(previous) = lock(&self.active).replace(session) {
            warn!(
                previous = %previous.active.call_id,
                "replacing a session that was never torn down"
            );
            previous.active.cancel.cancel();
        }
        info!(%call_id, ?joined, "call joined");
        Ok(joined)
    }

    async fn join_with_retry(&self, call: &dyn CallHandle) -> Result<JoinResult, DuetError> {
        match Self::attempt_join(call).await {
            Err(e) if e.is_transient() => {
                let delay = self.ctx.config.call.join_retry_delay();
                warn!(
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "join failed, retrying once"
                );
                tokio::time::sleep(delay).await;
                Self::attempt_join(call).await
            }
            other => other,
        }
    }

    async fn attempt_join(call: &dyn CallHandle) -> Result<JoinResult, DuetError> {
        match call.join(false).await {
            Ok(()) => Ok(JoinResult::Joined),
            Err(e) if e.is_already_joined() => {
                debug!("platform reports already joined, treating as success");
                Ok(JoinResult::AlreadyJoined)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs the single teardown for the active session.
    ///
    /// Returns `None` when another teardown is running or nothing is joined.
    /// Cleanup failures are swallowed; the penalty and moderation checks
    /// always run.
    pub async fn end_call(&self, reason: EndReason) -> Option<TeardownReport> {
        let _guard = {
            let mut state = lock(&self.teardown);
            if *state == TeardownState::InProgress {
                debug!(%reason, "teardown already in progress, dropping");
                return None;
            }
            *state = TeardownState::InProgress;
            TeardownGuard {
                state: &self.teardown,
            }
        };

        let Some(Session { active, report_tx }) = lock(&self.active).take() else {
            debug!(%reason, "no active call to end");
            return None;
        };
        active.cancel.cancel();
        info!(call_id = %active.call_id, %reason, "ending call");

        if let Err(e) = active.call.end_call().await {
            warn!(error = %e, "ending platform call failed, ignoring");
        }
        if let Err(e) = self.ctx.backend.leave_queue().await {
            debug!(error = %e, "leaving queue during teardown failed, ignoring");
        }
        if let Err(e) = self.account.refresh().await {
            warn!(error = %e, "refreshing account after call failed");
        }

        let penalty = self.penalty.evaluate(active.joined_at, Instant::now());
        if penalty.penalty_applied {
            info!(
                session_duration_secs = penalty.session_duration_secs,
                "call ended before the penalty threshold"
            );
            self.ctx.notifier.notify(Notice::EarlyExitPenalty {
                session_duration_secs: penalty.session_duration_secs,
            });
        }

        let (moderation, release) = self.run_moderation_check().await;

        let report = TeardownReport {
            reason,
            penalty,
            moderation,
            release,
        };
        report_tx.send_replace(Some(report.clone()));
        Some(report)
    }

    async fn run_moderation_check(&self) -> (Option<ModerationCheck>, Release) {
        let baseline = self.report_baseline();
        let check = match self.moderation.check_after_call(baseline).await {
            Ok(check) => check,
            Err(e) => {
                warn!(error = %e, "moderation check failed, releasing home");
                return (None, Release::Home);
            }
        };
        self.report_baseline
            .store(check.status.report_count, Ordering::SeqCst);

        let release = match &check.action {
            ModerationAction::Block { ban_expires_at } => {
                let mut message = "Your account has been temporarily banned.".to_string();
                if let Some(left) = ban_countdown(*ban_expires_at, Utc::now()) {
                    message.push_str(&format!(" Time remaining: {left}"));
                }
                self.ctx.notifier.notify(Notice::Banned {
                    message,
                    ban_expires_at: *ban_expires_at,
                });
                Release::AwaitAcknowledgement
            }
            ModerationAction::Warn { report_count } => {
                self.ctx.notifier.notify(Notice::ReportWarning {
                    report_count: *report_count,
                });
                Release::Home
            }
            ModerationAction::None => Release::Home,
        };
        (Some(check), release)
    }

    /// Toggles the microphone. A no-op with no call or once the call has left.
    pub async fn toggle_microphone(&self) {
        let Some(active) = self.active_call() else {
            return;
        };
        if active.call.calling_state() == CallingState::Left {
            return;
        }
        if let Err(e) = active.call.toggle_microphone().await {
            warn!(error = %e, "toggling microphone failed");
        }
    }
}
