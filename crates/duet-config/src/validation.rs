// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as backoff monotonicity, duration ordering, and URL shape.

use crate::diagnostic::ConfigError;
use crate::model::DuetConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &DuetConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.client.log_level.as_str()) {
        invalid(format!(
            "client.log_level `{}` must be one of: {}",
            config.client.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let base_url = config.backend.base_url.trim();
    if base_url.is_empty() {
        invalid("backend.base_url must not be empty".to_string());
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        invalid(format!(
            "backend.base_url `{base_url}` must start with http:// or https://"
        ));
    }

    if config.backend.request_timeout_secs == 0 {
        invalid("backend.request_timeout_secs must be at least 1".to_string());
    }

    // Backoff must never shrink, or the "non-decreasing delay" guarantee breaks.
    let mm = &config.matchmaking;
    if !(mm.poll_growth_factor.is_finite() && mm.poll_growth_factor >= 1.0) {
        invalid(format!(
            "matchmaking.poll_growth_factor must be >= 1.0, got {}",
            mm.poll_growth_factor
        ));
    }
    if mm.max_poll_delay_ms < mm.initial_poll_delay_ms {
        invalid(format!(
            "matchmaking.max_poll_delay_ms ({}) must be >= initial_poll_delay_ms ({})",
            mm.max_poll_delay_ms, mm.initial_poll_delay_ms
        ));
    }
    if mm.max_poll_attempts < 1 {
        invalid("matchmaking.max_poll_attempts must be at least 1".to_string());
    }

    if config.call.tick_interval_ms == 0 {
        invalid("call.tick_interval_ms must be at least 1".to_string());
    }

    let ext = &config.extension;
    if ext.extended_duration_secs <= ext.base_duration_secs {
        invalid(format!(
            "extension.extended_duration_secs ({}) must be greater than base_duration_secs ({})",
            ext.extended_duration_secs, ext.base_duration_secs
        ));
    }
    if ext.base_duration_secs <= config.call.warning_lead_secs {
        invalid(format!(
            "extension.base_duration_secs ({}) must be greater than call.warning_lead_secs ({})",
            ext.base_duration_secs, config.call.warning_lead_secs
        ));
    }
    if ext.min_balance_stars < ext.cost_stars {
        invalid(format!(
            "extension.min_balance_stars ({}) must cover cost_stars ({})",
            ext.min_balance_stars, ext.cost_stars
        ));
    }

    if config.moderation.report_limit < 1 {
        invalid("moderation.report_limit must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
