// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./duet.toml` > `~/.config/duet/duet.toml` > `/etc/duet/duet.toml`
//! with environment variable overrides via `DUET_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DuetConfig;

/// Config sections, used to map `DUET_<SECTION>_<KEY>` onto `section.key`.
const SECTIONS: &[&str] = &[
    "client",
    "backend",
    "matchmaking",
    "call",
    "extension",
    "moderation",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/duet/duet.toml` (system-wide)
/// 3. `~/.config/duet/duet.toml` (user XDG config)
/// 4. `./duet.toml` (local directory)
/// 5. `DUET_*` environment variables
pub fn load_config() -> Result<DuetConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<DuetConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DuetConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DuetConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DuetConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DuetConfig::default()))
        .merge(Toml::file("/etc/duet/duet.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("duet/duet.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("duet.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `DUET_BACKEND_ACCESS_TOKEN` to `backend.access_token`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("DUET_").map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        for section in SECTIONS {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.into()
    })
}
