// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Duet call orchestrator.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Classifies failures reported by the calling platform SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformErrorKind {
    /// The session was already joined; the join raced with the platform.
    AlreadyJoined,
    /// The signalling transport (websocket) failed before the join completed.
    Transport,
    /// Anything else the platform rejected.
    Other,
}

/// The primary error type used across the collaborator traits and the orchestrator.
#[derive(Debug, Error)]
pub enum DuetError {
    /// Configuration errors (invalid values, missing credentials).
    #[error("configuration error: {0}")]
    Config(String),

    /// The matchmaking backend could not be reached while joining the queue.
    #[error("matchmaking queue unavailable: {message}")]
    QueueUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend could not be reached (connection refused, DNS, timeout).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend answered with a failure status or a `success: false` envelope.
    #[error("backend error: {message}")]
    Backend {
        status: Option<u16>,
        message: String,
    },

    /// The account is banned from matchmaking (HTTP 403).
    #[error("account banned: {message}")]
    Banned {
        message: String,
        ban_expires_at: Option<DateTime<Utc>>,
    },

    /// The request was rejected by a rate limit (HTTP 429).
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    /// The calling platform rejected an SDK operation.
    #[error("calling platform error ({kind:?}): {message}")]
    Platform {
        kind: PlatformErrorKind,
        message: String,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DuetError {
    /// Shorthand for a platform error of the given kind.
    pub fn platform(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self::Platform {
            kind,
            message: message.into(),
        }
    }

    /// Returns true for failures worth one more attempt: dropped transports
    /// and timeouts. Rejections (bans, rate limits, bad envelopes) are final.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Timeout { .. }
                | Self::Platform {
                    kind: PlatformErrorKind::Transport,
                    ..
                }
        )
    }

    /// Returns true when the platform reports the session as already joined.
    pub fn is_already_joined(&self) -> bool {
        matches!(
            self,
            Self::Platform {
                kind: PlatformErrorKind::AlreadyJoined,
                ..
            }
        )
    }
}
