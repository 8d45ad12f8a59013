// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Formatting helpers for timers shown to the user.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Elapsed call time as `mm:ss`. Minutes are not wrapped at an hour.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Time left on a ban, e.g. `5h 12m` or `4m 09s`.
///
/// `None` when there is no expiry or it has already passed.
pub fn ban_countdown(ban_expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<String> {
    let remaining = ban_expires_at?.signed_duration_since(now);
    let secs = remaining.num_seconds();
    if secs <= 0 {
        return None;
    }
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    Some(if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m {seconds:02}s")
    })
}
