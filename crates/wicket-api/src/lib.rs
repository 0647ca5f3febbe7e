// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client crate for the support backend REST API.
//!
//! [`ApiClient`] implements [`wicket_core::traits::ConversationStore`]: the
//! synchronous fallback send path, message history, read-marking, and
//! conversation lifecycle calls. All durable state lives behind this seam;
//! Wicket itself persists nothing.

pub mod client;

pub use client::ApiClient;
