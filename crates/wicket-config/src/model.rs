// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Wicket client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Wicket configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WicketConfig {
    /// Client identity and logging settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Broker (WebSocket/STOMP) connection settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Support backend REST API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Client identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// The viewing user's id. `None` until authentication is wired in;
    /// self-message suppression is skipped without it.
    #[serde(default)]
    pub user_id: Option<i64>,

    /// Display name put on optimistically inserted message rows.
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            user_id: None,
            display_name: default_display_name(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_display_name() -> String {
    "me".to_string()
}

/// Broker connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// WebSocket URL of the STOMP broker endpoint (ws:// or wss://).
    #[serde(default = "default_broker_url")]
    pub url: String,

    /// Fixed delay between reconnection attempts, in seconds.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Timeout for a single connect attempt, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Capacity of each per-conversation inbound message queue. When a
    /// consumer lags this far behind, further frames for that conversation
    /// are dropped rather than blocking the read loop.
    #[serde(default = "default_subscription_buffer")]
    pub subscription_buffer: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            subscription_buffer: default_subscription_buffer(),
        }
    }
}

fn default_broker_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_subscription_buffer() -> usize {
    64
}

/// Support backend REST API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the backend REST API (http:// or https://).
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_api_timeout_secs() -> u64 {
    30
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Bearer token attached at broker connect time and on API requests.
    /// `None` disables connecting entirely.
    #[serde(default)]
    pub token: Option<String>,
}
