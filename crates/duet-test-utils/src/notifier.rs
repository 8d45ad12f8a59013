// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notice sink that records what the user would have seen.

use std::sync::Mutex;

use duet_core::{Notice, Notifier};
use tokio::time::Instant;

use crate::lock;

/// Records every notice together with the (possibly paused) tokio instant.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(Instant, Notice)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).iter().map(|(_, n)| n.clone()).collect()
    }

    pub fn timed(&self) -> Vec<(Instant, Notice)> {
        lock(&self.notices).clone()
    }

    /// Number of recorded notices matching `pred`.
    pub fn count(&self, pred: impl Fn(&Notice) -> bool) -> usize {
        lock(&self.notices).iter().filter(|(_, n)| pred(n)).count()
    }

    /// When the first notice matching `pred` was raised.
    pub fn first_at(&self, pred: impl Fn(&Notice) -> bool) -> Option<Instant> {
        lock(&self.notices)
            .iter()
            .find(|(_, n)| pred(n))
            .map(|(at, _)| *at)
    }

    pub fn clear(&self) {
        lock(&self.notices).clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        lock(&self.notices).push((Instant::now(), notice));
    }
}
