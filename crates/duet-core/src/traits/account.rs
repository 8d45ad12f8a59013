// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account endpoints: profile refresh and star debits.

use async_trait::async_trait;

use crate::error::DuetError;
use crate::types::UserProfile;

#[async_trait]
pub trait AccountApi: Send + Sync + 'static {
    /// Fetches the signed-in user's profile, including the star balance.
    async fn current_user(&self) -> Result<UserProfile, DuetError>;

    /// Debits `amount` stars from the signed-in user's balance.
    async fn decrease_stars(&self, amount: u32) -> Result<(), DuetError>;
}
