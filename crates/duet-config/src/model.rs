// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Duet call orchestrator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Duet configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to the product's tuned values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DuetConfig {
    /// Client-wide settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Backend endpoint and credentials.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Queue polling cadence.
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,

    /// Call join, debounce, and penalty timing.
    #[serde(default)]
    pub call: CallConfig,

    /// Paid duration extension.
    #[serde(default)]
    pub extension: ExtensionConfig,

    /// Report/ban gate.
    #[serde(default)]
    pub moderation: ModerationConfig,
}

/// Client-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Backend HTTP API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL every endpoint path is appended to, including the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token issued by the sign-in flow. `None` requires `DUET_BACKEND_ACCESS_TOKEN`.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Queue polling configuration.
///
/// After a `waiting` join response the client polls with a growing delay:
/// `initial_poll_delay_ms`, then multiplied by `poll_growth_factor` after each
/// non-terminal poll, capped at `max_poll_delay_ms`, for at most
/// `max_poll_attempts` polls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MatchmakingConfig {
    #[serde(default = "default_initial_poll_delay_ms")]
    pub initial_poll_delay_ms: u64,

    #[serde(default = "default_poll_growth_factor")]
    pub poll_growth_factor: f64,

    #[serde(default = "default_max_poll_delay_ms")]
    pub max_poll_delay_ms: u64,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            initial_poll_delay_ms: default_initial_poll_delay_ms(),
            poll_growth_factor: default_poll_growth_factor(),
            max_poll_delay_ms: default_max_poll_delay_ms(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl MatchmakingConfig {
    pub fn initial_poll_delay(&self) -> Duration {
        Duration::from_millis(self.initial_poll_delay_ms)
    }

    pub fn max_poll_delay(&self) -> Duration {
        Duration::from_millis(self.max_poll_delay_ms)
    }
}

fn default_initial_poll_delay_ms() -> u64 {
    3000
}

fn default_poll_growth_factor() -> f64 {
    1.2
}

fn default_max_poll_delay_ms() -> u64 {
    10_000
}

fn default_max_poll_attempts() -> u32 {
    15
}

/// Call lifecycle timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallConfig {
    /// Delay before the single retry of a join that failed on transport.
    #[serde(default = "default_join_retry_delay_ms")]
    pub join_retry_delay_ms: u64,

    /// Debounce between a detected partner disconnect and teardown.
    #[serde(default = "default_peer_left_debounce_ms")]
    pub peer_left_debounce_ms: u64,

    /// Debounce between the platform reporting the call as left and teardown.
    #[serde(default = "default_call_left_debounce_ms")]
    pub call_left_debounce_ms: u64,

    /// How long the "time's up" notice shows before teardown.
    #[serde(default = "default_times_up_notice_ms")]
    pub times_up_notice_ms: u64,

    /// Calls shorter than this are reported as early exits.
    #[serde(default = "default_penalty_threshold_secs")]
    pub penalty_threshold_secs: u64,

    /// How long before the maximum duration the warning fires.
    #[serde(default = "default_warning_lead_secs")]
    pub warning_lead_secs: u64,

    /// Period of the visible timer and the duration watchdog.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            join_retry_delay_ms: default_join_retry_delay_ms(),
            peer_left_debounce_ms: default_peer_left_debounce_ms(),
            call_left_debounce_ms: default_call_left_debounce_ms(),
            times_up_notice_ms: default_times_up_notice_ms(),
            penalty_threshold_secs: default_penalty_threshold_secs(),
            warning_lead_secs: default_warning_lead_secs(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl CallConfig {
    pub fn join_retry_delay(&self) -> Duration {
        Duration::from_millis(self.join_retry_delay_ms)
    }

    pub fn peer_left_debounce(&self) -> Duration {
        Duration::from_millis(self.peer_left_debounce_ms)
    }

    pub fn call_left_debounce(&self) -> Duration {
        Duration::from_millis(self.call_left_debounce_ms)
    }

    pub fn times_up_notice(&self) -> Duration {
        Duration::from_millis(self.times_up_notice_ms)
    }

    pub fn penalty_threshold(&self) -> Duration {
        Duration::from_secs(self.penalty_threshold_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn default_join_retry_delay_ms() -> u64 {
    1200
}

fn default_peer_left_debounce_ms() -> u64 {
    2000
}

fn default_call_left_debounce_ms() -> u64 {
    1000
}

fn default_times_up_notice_ms() -> u64 {
    3000
}

fn default_penalty_threshold_secs() -> u64 {
    60
}

fn default_warning_lead_secs() -> u64 {
    60
}

fn default_tick_interval_ms() -> u64 {
    1000
}

/// Paid duration extension.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionConfig {
    /// Maximum call duration before any extension.
    #[serde(default = "default_base_duration_secs")]
    pub base_duration_secs: u64,

    /// Maximum call duration after the one allowed extension.
    #[serde(default = "default_extended_duration_secs")]
    pub extended_duration_secs: u64,

    /// Stars debited for an extension.
    #[serde(default = "default_cost_stars")]
    pub cost_stars: u32,

    /// Balance required before an extension is attempted.
    #[serde(default = "default_min_balance_stars")]
    pub min_balance_stars: u32,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            base_duration_secs: default_base_duration_secs(),
            extended_duration_secs: default_extended_duration_secs(),
            cost_stars: default_cost_stars(),
            min_balance_stars: default_min_balance_stars(),
        }
    }
}

fn default_base_duration_secs() -> u64 {
    300
}

fn default_extended_duration_secs() -> u64 {
    600
}

fn default_cost_stars() -> u32 {
    10
}

fn default_min_balance_stars() -> u32 {
    10
}

/// Report/ban gate.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModerationConfig {
    /// Report count at which the backend bans; warnings show below it.
    #[serde(default = "default_report_limit")]
    pub report_limit: u32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            report_limit: default_report_limit(),
        }
    }
}

fn default_report_limit() -> u32 {
    3
}
