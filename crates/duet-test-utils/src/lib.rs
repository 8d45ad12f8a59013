// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Duet integration tests.
//!
//! Provides scripted collaborators so the orchestrator can be driven
//! deterministically on a paused tokio clock, without a backend or a
//! calling platform.
//!
//! # Components
//!
//! - [`MockBackend`] - Scripted matchmaking, account and moderation endpoints
//! - [`MockPlatform`] / [`MockCall`] - In-memory calling platform with an event broadcast
//! - [`RecordingNotifier`] - Captures every notice with the instant it was raised
//! - [`TestHarness`] - Bundles the above with a config

pub mod harness;
pub mod mock_backend;
pub mod mock_platform;
pub mod notifier;

pub use harness::TestHarness;
pub use mock_backend::MockBackend;
pub use mock_platform::{MockCall, MockPlatform};
pub use notifier::RecordingNotifier;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mock's state, recovering from poisoning left by a panicking test.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
