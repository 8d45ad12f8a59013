// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the collaborator traits and the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identifier of a calling-platform session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for CallId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// --- Matchmaking ---

/// Server-side status of a queue entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    Matched,
    NotInQueue,
}

/// A user's pending request to be matched, as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub user_id: UserId,
    pub status: QueueStatus,
    pub call_id: Option<CallId>,
    pub matched_with: Option<UserId>,
}

/// A resolved match: the call to join and the partner in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub call_id: CallId,
    pub peer_id: UserId,
}

/// Result of `POST /matchmaking/join`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Waiting,
    Matched(Match),
}

/// Result of `GET /matchmaking/status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Waiting,
    Matched(Match),
    NotInQueue,
}

impl PollOutcome {
    /// The wire-level status this outcome corresponds to.
    pub fn status(&self) -> QueueStatus {
        match self {
            PollOutcome::Waiting => QueueStatus::Waiting,
            PollOutcome::Matched(_) => QueueStatus::Matched,
            PollOutcome::NotInQueue => QueueStatus::NotInQueue,
        }
    }
}

// --- Calling platform ---

/// Calling state of a platform session. Only the platform advances it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallingState {
    Idle,
    Ringing,
    Joining,
    Joined,
    Left,
}

/// A member currently present in a platform session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    #[serde(default)]
    pub name: Option<String>,
}

impl Participant {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            name: None,
        }
    }
}

/// Events a platform session pushes to its subscribers.
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// The session's calling state changed.
    CallingState(CallingState),
    /// The participant list changed; carries the full current list.
    Participants(Vec<Participant>),
    /// An opaque custom message relayed from another member.
    Custom(serde_json::Value),
}

/// Settings applied when a call is created. The product is audio-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSettings {
    pub mic_default_on: bool,
    pub speaker_default: bool,
    pub camera_default_on: bool,
    pub video_enabled: bool,
}

impl CallSettings {
    pub fn audio_only() -> Self {
        Self {
            mic_default_on: true,
            speaker_default: true,
            camera_default_on: false,
            video_enabled: false,
        }
    }
}

// --- Duration extension ---

/// `type` tag of the extension announcement carried over the custom channel.
pub const EXTEND_CALL_DURATION: &str = "extend_call_duration";

/// Announcement that one member paid to extend the call.
///
/// Carried inside the platform's opaque custom-message envelope. Payloads with
/// any other `type` are ignored rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub extended_duration_seconds: u64,
    pub extended_by: UserId,
    pub extended_at: DateTime<Utc>,
}

impl ExtensionEvent {
    pub fn new(
        extended_duration_seconds: u64,
        extended_by: UserId,
        extended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EXTEND_CALL_DURATION.to_string(),
            extended_duration_seconds,
            extended_by,
            extended_at,
        }
    }

    /// Extracts an extension event from a custom payload.
    ///
    /// Returns `None` for unknown `type` values and for malformed payloads.
    pub fn from_custom(payload: &serde_json::Value) -> Option<Self> {
        let kind = payload.get("type").and_then(|t| t.as_str())?;
        if kind != EXTEND_CALL_DURATION {
            return None;
        }
        serde_json::from_value(payload.clone()).ok()
    }

    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// --- Account and moderation ---

/// The signed-in user's profile, including the star balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stars: u32,
}

/// Account-level report/ban state. Fetched fresh after every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationStatus {
    pub is_banned: bool,
    #[serde(default)]
    pub ban_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub report_count: u32,
    #[serde(default)]
    pub weekly_ban_count: u32,
}

// --- User-visible notices ---

/// Notices surfaced to the user by the orchestrator.
///
/// Rendering is owned by the UI collaborator; [`Notice::text`] gives the
/// default wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The queue search timed out without a partner.
    NoMatch,
    /// Joining the queue failed for a reason other than a ban.
    QueueFailed { message: String },
    /// The account is banned. Blocks re-entry until acknowledged.
    Banned {
        message: String,
        ban_expires_at: Option<DateTime<Utc>>,
    },
    /// The call could not be created or joined.
    ConnectionFailed,
    /// The partner disconnected.
    PartnerLeft,
    /// One minute of call time remains.
    OneMinuteRemaining,
    /// The maximum call duration has been reached.
    TimesUp,
    /// This user extended the call.
    CallExtended { extended_duration_seconds: u64 },
    /// The partner extended the call.
    PartnerExtended { extended_duration_seconds: u64 },
    /// An extension attempt was refused or failed.
    ExtensionFailed { reason: String },
    /// The call ended before the penalty threshold.
    EarlyExitPenalty { session_duration_secs: u64 },
    /// The account received a new report.
    ReportWarning { report_count: u32 },
    ReportSubmitted,
    /// The daily report allowance is used up.
    ReportRateLimited,
    ReportFailed { message: String },
}

impl Notice {
    /// Default user-facing wording for this notice.
    pub fn text(&self) -> String {
        match self {
            Notice::NoMatch => "Could not find a match. Please try again later.".to_string(),
            Notice::QueueFailed { message } => message.clone(),
            Notice::Banned { message, .. } => message.clone(),
            Notice::ConnectionFailed => {
                "Could not join the call. Please try again.".to_string()
            }
            Notice::PartnerLeft => "The other person has left the call".to_string(),
            Notice::OneMinuteRemaining => "One minute left in this call".to_string(),
            Notice::TimesUp => "Time's up! The call is ending.".to_string(),
            Notice::CallExtended {
                extended_duration_seconds,
            } => format!(
                "Call extended to {} minutes",
                extended_duration_seconds / 60
            ),
            Notice::PartnerExtended {
                extended_duration_seconds,
            } => format!(
                "Your partner extended the call to {} minutes",
                extended_duration_seconds / 60
            ),
            Notice::ExtensionFailed { reason } => format!("Could not extend the call: {reason}"),
            Notice::EarlyExitPenalty { .. } => {
                "1 coin deducted for ending call before 1 minute".to_string()
            }
            Notice::ReportWarning { report_count } => {
                if *report_count >= 2 {
                    format!(
                        "You have received {report_count} reports. One more report will result in a temporary ban."
                    )
                } else {
                    "You have received a report. Please keep conversations respectful."
                        .to_string()
                }
            }
            Notice::ReportSubmitted => "Report submitted. Thank you.".to_string(),
            Notice::ReportRateLimited => {
                "You have reached the daily report limit. Please try again tomorrow.".to_string()
            }
            Notice::ReportFailed { message } => format!("Could not submit report: {message}"),
        }
    }

    /// Returns true for notices the user must dismiss before continuing.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Notice::Banned { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn queue_status_wire_names() {
        let json = serde_json::to_string(&QueueStatus::NotInQueue).unwrap();
        assert_eq!(json, "\"not_in_queue\"");
        assert_eq!(QueueStatus::from_str("matched").unwrap(), QueueStatus::Matched);
        assert_eq!(QueueStatus::Waiting.to_string(), "waiting");
    }

    #[test]
    fn extension_event_payload_shape() {
        let at = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = ExtensionEvent::new(600, UserId::from("u1"), at);
        let payload = event.to_payload();
        assert_eq!(payload["type"], "extend_call_duration");
        assert_eq!(payload["extendedDurationSeconds"], 600);
        assert_eq!(payload["extendedBy"], "u1");
        assert_eq!(ExtensionEvent::from_custom(&payload), Some(event));
    }

    #[test]
    fn unknown_custom_type_is_ignored() {
        let payload = serde_json::json!({"type": "emoji_reaction", "emoji": "wave"});
        assert!(ExtensionEvent::from_custom(&payload).is_none());
    }

    #[test]
    fn malformed_extension_payload_is_ignored() {
        let payload = serde_json::json!({"type": "extend_call_duration", "extendedBy": 7});
        assert!(ExtensionEvent::from_custom(&payload).is_none());
    }

    #[test]
    fn moderation_status_defaults_missing_counts() {
        let status: ModerationStatus = serde_json::from_str(r#"{"isBanned": false}"#).unwrap();
        assert_eq!(status.report_count, 0);
        assert!(status.ban_expires_at.is_none());
    }

    #[test]
    fn user_profile_reads_mongo_id() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"_id": "abc", "name": "Sam", "stars": 12}"#).unwrap();
        assert_eq!(profile.id, UserId::from("abc"));
        assert_eq!(profile.stars, 12);
    }

    #[test]
    fn report_warning_wording_changes_at_second_report() {
        let first = Notice::ReportWarning { report_count: 1 }.text();
        let second = Notice::ReportWarning { report_count: 2 }.text();
        assert!(first.contains("a report"));
        assert!(second.contains("One more report"));
    }

    #[test]
    fn only_bans_block() {
        assert!(
            Notice::Banned {
                message: "x".into(),
                ban_expires_at: None
            }
            .is_blocking()
        );
        assert!(!Notice::NoMatch.is_blocking());
    }
}
