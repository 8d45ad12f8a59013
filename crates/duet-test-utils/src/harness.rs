// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness bundling the mock collaborators with a config.
//!
//! The harness keeps concrete handles so tests can script and inspect the
//! mocks, and hands out trait objects for wiring the orchestrator.

use std::sync::Arc;

use duet_config::model::DuetConfig;
use duet_core::{BackendApi, CallPlatform, Notifier, UserId};

use crate::mock_backend::MockBackend;
use crate::mock_platform::MockPlatform;
use crate::notifier::RecordingNotifier;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    self_id: String,
    stars: u32,
    config: DuetConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            self_id: "self-user".to_string(),
            stars: 50,
            config: DuetConfig::default(),
        }
    }

    /// Set the signed-in user's id.
    pub fn with_self_id(mut self, id: &str) -> Self {
        self.self_id = id.to_string();
        self
    }

    /// Set the starting star balance.
    pub fn with_stars(mut self, stars: u32) -> Self {
        self.stars = stars;
        self
    }

    /// Adjust the default config.
    pub fn with_config(mut self, edit: impl FnOnce(&mut DuetConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    pub fn build(self) -> TestHarness {
        TestHarness {
            self_id: UserId::from(self.self_id.as_str()),
            backend: Arc::new(MockBackend::new(&self.self_id, self.stars)),
            platform: Arc::new(MockPlatform::new(&self.self_id)),
            notifier: Arc::new(RecordingNotifier::new()),
            config: self.config,
        }
    }
}

/// Mock collaborators for one signed-in user.
pub struct TestHarness {
    pub self_id: UserId,
    pub backend: Arc<MockBackend>,
    pub platform: Arc<MockPlatform>,
    pub notifier: Arc<RecordingNotifier>,
    pub config: DuetConfig,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn backend_api(&self) -> Arc<dyn BackendApi> {
        self.backend.clone()
    }

    pub fn platform_api(&self) -> Arc<dyn CallPlatform> {
        self.platform.clone()
    }

    pub fn notifier_api(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::builder().build()
    }
}
