// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Duet backend HTTP API.

use chrono::{DateTime, Utc};
use duet_core::types::{JoinOutcome, Match, PollOutcome, QueueStatus};
use duet_core::{CallId, DuetError, UserId};
use serde::{Deserialize, Serialize};

/// Envelope wrapping every backend response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// The message to show for a failed envelope.
    pub fn failure_message(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

// --- Matchmaking ---

/// `data` of `POST /matchmaking/join`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinData {
    pub status: QueueStatus,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub matched_with: Option<String>,
}

impl JoinData {
    pub fn into_outcome(self) -> Result<JoinOutcome, DuetError> {
        match self.status {
            QueueStatus::Waiting => Ok(JoinOutcome::Waiting),
            QueueStatus::Matched => {
                resolve_match(self.call_id, self.matched_with).map(JoinOutcome::Matched)
            }
            QueueStatus::NotInQueue => Err(DuetError::Backend {
                status: None,
                message: "Unexpected queue status".to_string(),
            }),
        }
    }
}

/// `data` of `GET /matchmaking/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    pub status: QueueStatus,
    #[serde(default)]
    pub queue_entry: Option<QueueEntryWire>,
}

/// Queue entry as stored by the backend (snake_case fields).
#[derive(Debug, Clone, Deserialize)]
pub struct QueueEntryWire {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub matched_with: Option<String>,
}

impl StatusData {
    pub fn into_outcome(self) -> Result<PollOutcome, DuetError> {
        match self.status {
            QueueStatus::Waiting => Ok(PollOutcome::Waiting),
            QueueStatus::NotInQueue => Ok(PollOutcome::NotInQueue),
            QueueStatus::Matched => {
                let entry = self.queue_entry.ok_or_else(|| DuetError::Backend {
                    status: None,
                    message: "matched status without a queue entry".to_string(),
                })?;
                resolve_match(entry.call_id, entry.matched_with).map(PollOutcome::Matched)
            }
        }
    }
}

fn resolve_match(call_id: Option<String>, peer_id: Option<String>) -> Result<Match, DuetError> {
    match (call_id, peer_id) {
        (Some(call_id), Some(peer_id)) if !call_id.is_empty() && !peer_id.is_empty() => {
            Ok(Match {
                call_id: CallId(call_id),
                peer_id: UserId(peer_id),
            })
        }
        _ => Err(DuetError::Backend {
            status: None,
            message: "matched status without call id or partner".to_string(),
        }),
    }
}

// --- Account and moderation ---

/// Body of `POST /users/stars/decrease`.
#[derive(Debug, Clone, Serialize)]
pub struct DecreaseStarsRequest {
    pub amount: u32,
}

/// Body of `POST /reports/submit`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest<'a> {
    pub reported_user_id: &'a str,
    pub reason: &'a str,
}

/// Optional `data` carried by a 403 ban response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanDetails {
    #[serde(default)]
    pub ban_expires_at: Option<DateTime<Utc>>,
}
