// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Wicket support-chat client.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Wicket workspace. The broker client,
//! HTTP API client, and session layer all implement or consume seams
//! defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WicketError;
pub use types::{
    ChatMessage, ConnectionState, Conversation, ConversationId, ConversationStatus,
    MessageId, OutboundChat, UserId,
};

// Re-export all collaborator traits at crate root.
pub use traits::{ConversationStore, CredentialProvider, PushChannel, ViewerIdentity};
