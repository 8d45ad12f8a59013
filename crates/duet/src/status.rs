// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `duet status` command implementation.
//!
//! Fetches the profile and the moderation status and prints both, with a
//! countdown when the account is banned.

use chrono::{DateTime, Utc};
use duet_backend::BackendClient;
use duet_config::DuetConfig;
use duet_core::types::{ModerationStatus, UserProfile};
use duet_core::{AccountApi, DuetError, ModerationApi};
use duet_session::display::ban_countdown;

pub async fn run_status(config: &DuetConfig) -> Result<(), DuetError> {
    let client = BackendClient::from_config(&config.backend)?;
    let profile = client.current_user().await?;
    let moderation = client.ban_status().await?;

    for line in render(&profile, &moderation, config.moderation.report_limit, Utc::now()) {
        println!("{line}");
    }
    Ok(())
}

fn render(
    profile: &UserProfile,
    status: &ModerationStatus,
    report_limit: u32,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut lines = vec![
        format!("user:     {} ({})", profile.name, profile.id),
        format!("stars:    {}", profile.stars),
        format!("reports:  {}/{}", status.report_count, report_limit),
    ];
    if status.is_banned {
        let remaining = ban_countdown(status.ban_expires_at, now)
            .unwrap_or_else(|| "until further notice".to_string());
        lines.push(format!("banned:   {remaining}"));
    } else {
        lines.push("banned:   no".to_string());
    }
    if status.weekly_ban_count > 0 {
        lines.push(format!("bans this week: {}", status.weekly_ban_count));
    }
    lines
}
