// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./wicket.toml` > `~/.config/wicket/wicket.toml` >
//! `/etc/wicket/wicket.toml` with environment variable overrides via the
//! `WICKET_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WicketConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wicket/wicket.toml` (system-wide)
/// 3. `~/.config/wicket/wicket.toml` (user XDG config)
/// 4. `./wicket.toml` (local directory)
/// 5. `WICKET_*` environment variables
pub fn load_config() -> Result<WicketConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<WicketConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WicketConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WicketConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WicketConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use so callers can inspect provider metadata).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WicketConfig::default()))
        .merge(Toml::file("/etc/wicket/wicket.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("wicket/wicket.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("wicket.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WICKET_BROKER_RECONNECT_DELAY_SECS`
/// must map to `broker.reconnect_delay_secs`, not `broker.reconnect.delay.secs`.
fn env_provider() -> Env {
    Env::prefixed("WICKET_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: WICKET_BROKER_URL -> "broker_url"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("client_", "client.", 1)
            .replacen("broker_", "broker.", 1)
            .replacen("api_", "api.", 1)
            .replacen("auth_", "auth.", 1);
        mapped.into()
    })
}
