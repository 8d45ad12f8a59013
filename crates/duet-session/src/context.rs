// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit session context handed to every subsystem.

use std::sync::Arc;

use duet_config::model::DuetConfig;
use duet_core::{BackendApi, CallPlatform, Notifier, UserId};

/// Everything a subsystem needs from the outside world.
///
/// Created once per signed-in user and cloned into each subsystem.
#[derive(Clone)]
pub struct SessionContext {
    pub self_id: UserId,
    pub backend: Arc<dyn BackendApi>,
    pub platform: Arc<dyn CallPlatform>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<DuetConfig>,
}

impl SessionContext {
    pub fn new(
        self_id: UserId,
        backend: Arc<dyn BackendApi>,
        platform: Arc<dyn CallPlatform>,
        notifier: Arc<dyn Notifier>,
        config: DuetConfig,
    ) -> Self {
        Self {
            self_id,
            backend,
            platform,
            notifier,
            config: Arc::new(config),
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("self_id", &self.self_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl SessionContext {
    pub(crate) fn from_harness(harness: &duet_test_utils::TestHarness) -> Self {
        Self::new(
            harness.self_id.clone(),
            harness.backend_api(),
            harness.platform_api(),
            harness.notifier_api(),
            harness.config.clone(),
        )
    }
}
