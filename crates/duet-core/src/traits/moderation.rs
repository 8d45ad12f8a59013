// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report and ban-status endpoints.

use async_trait::async_trait;

use crate::error::DuetError;
use crate::types::{ModerationStatus, UserId};

#[async_trait]
pub trait ModerationApi: Send + Sync + 'static {
    /// Fetches the current report/ban status. Stateless on the server side.
    async fn ban_status(&self) -> Result<ModerationStatus, DuetError>;

    /// Reports another user. Fails with [`DuetError::RateLimited`] once the
    /// daily allowance is used up.
    async fn submit_report(&self, reported_user_id: &UserId, reason: &str)
    -> Result<(), DuetError>;
}
