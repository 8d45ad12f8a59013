// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-call report/ban gate and report submission.
//!
//! The ban-status endpoint is stateless, so a warning is only shown when the
//! report count grew past the last value the caller observed. The gate does
//! not remember that value itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use duet_core::types::ModerationStatus;
use duet_core::{BackendApi, DuetError, Notice, Notifier, UserId};
use tracing::{info, warn};

/// What the UI should do before releasing the user back to idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationAction {
    /// Navigate home immediately.
    None,
    /// Show a report warning, then navigate home.
    Warn { report_count: u32 },
    /// Show the ban notice and wait for acknowledgement.
    Block {
        ban_expires_at: Option<DateTime<Utc>>,
    },
}

/// Result of a post-call check: the decision plus the fetched status.
#[derive(Debug, Clone)]
pub struct ModerationCheck {
    pub action: ModerationAction,
    pub status: ModerationStatus,
}

pub struct ModerationGate {
    backend: Arc<dyn BackendApi>,
    notifier: Arc<dyn Notifier>,
    report_limit: u32,
}

impl ModerationGate {
    pub fn new(backend: Arc<dyn BackendApi>, notifier: Arc<dyn Notifier>, report_limit: u32) -> Self {
        Self {
            backend,
            notifier,
            report_limit,
        }
    }

    /// Pure decision table over a fetched status and the last observed count.
    pub fn decide(&self, status: &ModerationStatus, last_report_count: u32) -> ModerationAction {
        if status.is_banned {
            return ModerationAction::Block {
                ban_expires_at: status.ban_expires_at,
            };
        }

        let count = status.report_count;
        if count > 0 && count < self.report_limit && count > last_report_count {
            return ModerationAction::Warn {
                report_count: count,
            };
        }

        ModerationAction::None
    }

    /// Fetches the status fresh and decides.
    pub async fn check_after_call(
        &self,
        last_report_count: u32,
    ) -> Result<ModerationCheck, DuetError> {
        let status = self.backend.ban_status().await?;
        let action = self.decide(&status, last_report_count);
        info!(
            banned = status.is_banned,
            report_count = status.report_count,
            ?action,
            "moderation checked"
        );
        Ok(ModerationCheck { action, status })
    }

    /// Reports `peer_id` and tells the user how it went.
    pub async fn submit_report(&self, peer_id: &UserId, reason: &str) -> Result<(), DuetError> {
        match self.backend.submit_report(peer_id, reason).await {
            Ok(()) => {
                info!(peer = %peer_id, "report submitted");
                self.notifier.notify(Notice::ReportSubmitted);
                Ok(())
            }
            Err(e @ DuetError::RateLimited { .. }) => {
                warn!("daily report limit reached");
                self.notifier.notify(Notice::ReportRateLimited);
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "report submission failed");
                let message = match &e {
                    DuetError::Backend { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                self.notifier.notify(Notice::ReportFailed { message });
                Err(e)
            }
        }
    }
}
