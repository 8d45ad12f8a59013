// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Early-exit classification.
//!
//! The client only informs the user; the backend decides and performs the
//! actual deduction.

use std::time::Duration;

use tokio::time::Instant;

/// Outcome of one teardown's penalty check. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyRecord {
    pub session_duration_secs: u64,
    pub penalty_applied: bool,
}

/// Classifies a session's length against the early-exit threshold.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyCalculator {
    threshold: Duration,
}

impl PenaltyCalculator {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// `penalized` iff `now - session_start` is strictly below the threshold.
    pub fn evaluate(&self, session_start: Instant, now: Instant) -> PenaltyRecord {
        let elapsed = now.saturating_duration_since(session_start);
        PenaltyRecord {
            session_duration_secs: elapsed.as_secs(),
            penalty_applied: elapsed < self.threshold,
        }
    }
}

impl Default for PenaltyCalculator {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
