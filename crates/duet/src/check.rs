// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `duet check` command implementation.

use duet_config::DuetConfig;

/// Human-readable summary of the effective configuration.
///
/// The access token is only reported as present or missing.
pub fn summary(config: &DuetConfig) -> Vec<String> {
    let token = match config.backend.access_token.as_deref() {
        Some(t) if !t.trim().is_empty() => "set",
        _ => "missing",
    };
    let mm = &config.matchmaking;
    let ext = &config.extension;
    vec![
        format!("backend:      {} (token {token})", config.backend.base_url),
        format!(
            "matchmaking:  first poll after {}ms, x{} up to {}ms, {} polls",
            mm.initial_poll_delay_ms, mm.poll_growth_factor, mm.max_poll_delay_ms, mm.max_poll_attempts
        ),
        format!(
            "call length:  {}s, {}s once extended for {} stars (min balance {})",
            ext.base_duration_secs, ext.extended_duration_secs, ext.cost_stars, ext.min_balance_stars
        ),
        format!(
            "penalty:      calls under {}s",
            config.call.penalty_threshold_secs
        ),
        format!("log level:    {}", config.client.log_level),
    ]
}

pub fn print_summary(config: &DuetConfig) {
    println!("duet: config OK");
    for line in summary(config) {
        println!("  {line}");
    }
}
