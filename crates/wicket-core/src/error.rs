// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Wicket client stack.

use thiserror::Error;

/// The primary error type used across all Wicket crates.
///
/// Only [`WicketError::Persistence`] is surfaced to the user as an
/// actionable failure; every other variant is logged and recovered
/// (reconnection, frame drop, fallback path).
#[derive(Debug, Error)]
pub enum WicketError {
    /// Configuration errors (invalid TOML, missing required fields, bad URLs).
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation needed the real-time channel while it was not CONNECTED.
    /// Sends recover via the fallback path; subscribes are logged and skipped.
    #[error("real-time channel unavailable for {operation}")]
    ConnectionUnavailable { operation: String },

    /// The broker rejected the connection or a frame (bad credential,
    /// malformed destination). Forces DISCONNECTED; reconnection takes over.
    #[error("broker protocol error: {message}")]
    Protocol {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A received frame's payload could not be parsed. The frame is dropped.
    #[error("frame decode error: {message}")]
    Decode {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The persistence backend failed (fallback send, history, read-marking).
    #[error("persistence error: {message}")]
    Persistence {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WicketError {
    /// Whether this error should reach the user as an actionable failure
    /// rather than being absorbed by reconnection or the fallback path.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, WicketError::Persistence { .. })
    }
}
