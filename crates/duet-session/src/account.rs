// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cached profile of the signed-in user.

use std::sync::Arc;

use duet_core::types::UserProfile;
use duet_core::{BackendApi, DuetError};
use tokio::sync::RwLock;
use tracing::debug;

/// Last known profile, refreshed after every call and on demand.
pub struct AccountCache {
    backend: Arc<dyn BackendApi>,
    profile: RwLock<Option<UserProfile>>,
}

impl AccountCache {
    pub fn new(backend: Arc<dyn BackendApi>) -> Self {
        Self {
            backend,
            profile: RwLock::new(None),
        }
    }

    /// Fetches the profile from the backend and caches it.
    pub async fn refresh(&self) -> Result<UserProfile, DuetError> {
        let profile = self.backend.current_user().await?;
        debug!(stars = profile.stars, "account refreshed");
        *self.profile.write().await = Some(profile.clone());
        Ok(profile)
    }

    pub async fn cached(&self) -> Option<UserProfile> {
        self.profile.read().await.clone()
    }

    /// Star balance from the cache, fetching once if nothing is cached.
    pub async fn stars(&self) -> Result<u32, DuetError> {
        if let Some(profile) = self.profile.read().await.as_ref() {
            return Ok(profile.stars);
        }
        Ok(self.refresh().await?.stars)
    }

    /// Lowers the cached balance after a successful debit.
    pub async fn debit(&self, amount: u32) {
        if let Some(profile) = self.profile.write().await.as_mut() {
            profile.stars = profile.stars.saturating_sub(amount);
        }
    }
}
