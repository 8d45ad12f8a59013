// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The call-session orchestrator facade.
//!
//! Ties the queue client, lifecycle controller, extension protocol and
//! moderation gate together for one signed-in user. All operations take
//! `&self`, so the UI can hold the orchestrator in an `Arc` and call
//! `end_call` or `request_extension` while `supervise` is running.

use std::sync::{Arc, Mutex};

use duet_core::types::CallSettings;
use duet_core::{DuetError, Match, Notice};
use tracing::{info, warn};

use crate::account::AccountCache;
use crate::context::SessionContext;
use crate::extension::{DurationExtensionProtocol, ExtensionOutcome, RejectReason};
use crate::lifecycle::{CallLifecycleController, EndReason, JoinResult, TeardownReport};
use crate::lock;
use crate::moderation::ModerationGate;
use crate::queue::{QueueClient, SearchOutcome};
use crate::supervisor::CallSupervisor;

const QUEUE_FAILED_FALLBACK: &str = "Failed to join queue. Please try again.";

/// How one pass of [`CallOrchestrator::run_once`] ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The search ended without a partner.
    Unmatched(SearchOutcome),
    /// A partner was found but the call could not be joined.
    ConnectFailed(DuetError),
    /// The call ran and was torn down.
    Ended(Option<TeardownReport>),
}

pub struct CallOrchestrator {
    ctx: SessionContext,
    queue: QueueClient,
    account: Arc<AccountCache>,
    moderation: Arc<ModerationGate>,
    controller: Arc<CallLifecycleController>,
    protocol: Mutex<Option<Arc<DurationExtensionProtocol>>>,
    current_match: Mutex<Option<Match>>,
}

impl CallOrchestrator {
    pub fn new(ctx: SessionContext) -> Self {
        let queue = QueueClient::new(ctx.backend.clone(), ctx.config.matchmaking.clone());
        let account = Arc::new(AccountCache::new(ctx.backend.clone()));
        let moderation = Arc::new(ModerationGate::new(
            ctx.backend.clone(),
            ctx.notifier.clone(),
            ctx.config.moderation.report_limit,
        ));
        let controller = Arc::new(CallLifecycleController::new(
            ctx.clone(),
            account.clone(),
            moderation.clone(),
        ));
        Self {
            ctx,
            queue,
            account,
            moderation,
            controller,
            protocol: Mutex::new(None),
            current_match: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn account(&self) -> &AccountCache {
        &self.account
    }

    pub fn controller(&self) -> &CallLifecycleController {
        &self.controller
    }

    pub fn queue(&self) -> &QueueClient {
        &self.queue
    }

    /// The most recent match, kept after teardown so the partner can be reported.
    pub fn current_match(&self) -> Option<Match> {
        lock(&self.current_match).clone()
    }

    /// Searches the queue and surfaces the matching notice for the outcome.
    pub async fn find_partner(&self) -> SearchOutcome {
        let outcome = self.queue.search().await;
        match &outcome {
            SearchOutcome::Matched(found) => {
                info!(call_id = %found.call_id, peer = %found.peer_id, "partner found");
            }
            SearchOutcome::TimedOut => self.ctx.notifier.notify(Notice::NoMatch),
            SearchOutcome::Failed(DuetError::Banned {
                message,
                ban_expires_at,
            }) => self.ctx.notifier.notify(Notice::Banned {
                message: message.clone(),
                ban_expires_at: *ban_expires_at,
            }),
            SearchOutcome::Failed(e) => {
                let message = match e {
                    DuetError::Backend { message, .. } if !message.is_empty() => message.clone(),
                    _ => QUEUE_FAILED_FALLBACK.to_string(),
                };
                self.ctx.notifier.notify(Notice::QueueFailed { message });
            }
            SearchOutcome::NotInQueue | SearchOutcome::Cancelled => {}
        }
        outcome
    }

    /// Stops a running search and leaves the queue.
    pub async fn cancel_search(&self) -> bool {
        self.queue.cancel().await
    }

    /// Creates the audio-only call for `found` and joins it.
    ///
    /// Each newly joined session gets a fresh extension protocol, so the
    /// duration state never carries over between calls. If the call cannot
    /// be created or joined, the queue entry is left before returning.
    pub async fn connect(&self, found: &Match) -> Result<(), DuetError> {
        let call = self.ctx.platform.call(&found.call_id);
        let members = [self.ctx.self_id.clone(), found.peer_id.clone()];
        if let Err(e) = call.get_or_create(&members, &CallSettings::audio_only()).await {
            warn!(call_id = %found.call_id, error = %e, "creating call failed");
            self.ctx.notifier.notify(Notice::ConnectionFailed);
            self.queue.leave().await;
            return Err(e);
        }

        let joined = match self.controller.join(&found.call_id).await {
            Ok(joined) => joined,
            Err(e) => {
                self.queue.leave().await;
                return Err(e);
            }
        };
        if joined == JoinResult::Duplicate {
            return Ok(());
        }

        let active = self
            .controller
            .active_call()
            .ok_or_else(|| DuetError::Internal("joined call has no active session".into()))?;
        let protocol = DurationExtensionProtocol::new(&self.ctx, active.call, self.account.clone());
        *lock(&self.protocol) = Some(Arc::new(protocol));
        *lock(&self.current_match) = Some(found.clone());
        Ok(())
    }

    /// Supervises the joined call until it ends, then runs the teardown.
    ///
    /// If the call was ended from elsewhere (for example [`Self::end_call`]),
    /// returns the report of that teardown instead.
    pub async fn supervise(&self) -> Option<TeardownReport> {
        let active = self.controller.active_call()?;
        let protocol = lock(&self.protocol).clone()?;
        let supervisor = CallSupervisor::new(
            self.ctx.self_id.clone(),
            active.clone(),
            protocol,
            self.ctx.notifier.clone(),
            self.ctx.config.call.clone(),
        );

        if let Some(reason) = supervisor.run().await {
            if let Some(report) = self.controller.end_call(reason).await {
                return Some(report);
            }
        }
        active.teardown_report().await
    }

    /// One full pass: find a partner, connect, supervise.
    pub async fn run_once(&self) -> SessionOutcome {
        let found = match self.find_partner().await {
            SearchOutcome::Matched(found) => found,
            other => return SessionOutcome::Unmatched(other),
        };
        if let Err(e) = self.connect(&found).await {
            return SessionOutcome::ConnectFailed(e);
        }
        SessionOutcome::Ended(self.supervise().await)
    }

    /// User-initiated end.
    pub async fn end_call(&self) -> Option<TeardownReport> {
        self.controller.end_call(EndReason::User).await
    }

    pub async fn request_extension(&self) -> Result<ExtensionOutcome, DuetError> {
        let protocol = match (self.controller.active_call(), lock(&self.protocol).clone()) {
            (Some(_), Some(protocol)) => protocol,
            _ => {
                let reason = RejectReason::NoActiveCall;
                self.ctx.notifier.notify(Notice::ExtensionFailed {
                    reason: reason.to_string(),
                });
                return Ok(ExtensionOutcome::Rejected(reason));
            }
        };
        protocol.request_extension().await
    }

    /// Current maximum duration of the active call, if any.
    pub fn current_max(&self) -> Option<u64> {
        self.controller.active_call()?;
        lock(&self.protocol).as_ref().map(|p| p.current_max())
    }

    pub async fn toggle_microphone(&self) {
        self.controller.toggle_microphone().await;
    }

    /// Reports the current (or most recent) partner.
    pub async fn submit_report(&self, reason: &str) -> Result<(), DuetError> {
        let Some(found) = self.current_match() else {
            let message = "there is no partner to report".to_string();
            self.ctx.notifier.notify(Notice::ReportFailed {
                message: message.clone(),
            });
            return Err(DuetError::Internal(message));
        };
        self.moderation.submit_report(&found.peer_id, reason).await
    }

    /// Seeds the report-count baseline so a report received before this
    /// process started is not announced after the first call.
    pub async fn prime_moderation_baseline(&self) -> Result<u32, DuetError> {
        let status = self.ctx.backend.ban_status().await?;
        self.controller.prime_baseline(status.report_count);
        info!(report_count = status.report_count, "moderation baseline primed");
        Ok(status.report_count)
    }
}
