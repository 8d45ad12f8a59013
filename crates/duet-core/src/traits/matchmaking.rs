// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matchmaking queue endpoints.

use async_trait::async_trait;

use crate::error::DuetError;
use crate::types::{JoinOutcome, PollOutcome};

/// The backend's matchmaking queue, as seen by one signed-in user.
#[async_trait]
pub trait MatchmakingApi: Send + Sync + 'static {
    /// Enqueues the user. Fails with [`DuetError::QueueUnavailable`] when the
    /// backend cannot be reached and [`DuetError::Banned`] on HTTP 403.
    async fn join_queue(&self) -> Result<JoinOutcome, DuetError>;

    /// Reads the current queue status. Idempotent.
    async fn queue_status(&self) -> Result<PollOutcome, DuetError>;

    /// Removes the user's queue entry, if any.
    async fn leave_queue(&self) -> Result<(), DuetError>;
}
