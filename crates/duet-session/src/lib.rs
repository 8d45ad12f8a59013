// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call-session orchestrator for Duet.
//!
//! The [`CallOrchestrator`] drives one user from the matchmaking queue into a
//! time-boxed call and back out:
//! - [`QueueClient`] joins the queue and polls with backoff until a match
//! - [`CallLifecycleController`] joins the call and runs the single teardown
//! - [`DurationExtensionProtocol`] handles the one paid extension and the watchdog
//! - [`DisconnectDetector`] spots a partner who joined and then left
//! - [`PenaltyCalculator`] and [`ModerationGate`] run after every teardown

pub mod account;
pub mod context;
pub mod disconnect;
pub mod display;
pub mod extension;
pub mod lifecycle;
pub mod moderation;
pub mod orchestrator;
pub mod penalty;
pub mod queue;
pub mod shutdown;
pub mod supervisor;

pub use account::AccountCache;
pub use context::SessionContext;
pub use disconnect::{DisconnectDetector, DisconnectSignal};
pub use extension::{
    DurationExtensionProtocol, DurationState, ExtensionOutcome, RejectReason, WatchdogSignal,
};
pub use lifecycle::{
    CallLifecycleController, EndReason, JoinResult, Release, TeardownReport, TeardownState,
};
pub use moderation::{ModerationAction, ModerationCheck, ModerationGate};
pub use orchestrator::{CallOrchestrator, SessionOutcome};
pub use penalty::{PenaltyCalculator, PenaltyRecord};
pub use queue::{PollSchedule, QueueClient, QueueState, SearchOutcome};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks short-lived session state, recovering from poisoning.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
