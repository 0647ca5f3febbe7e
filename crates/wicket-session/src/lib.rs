// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration for the Wicket support-chat client.
//!
//! [`DeliveryController`] encodes the dual-path send logic (push publish
//! with optimistic insertion, store fallback) and self-echo suppression.
//! [`ConversationSession`] binds it to UI-facing state: the selected
//! conversation, its message list, and the subscribe/unsubscribe switch
//! discipline.

pub mod delivery;
pub mod session;

pub use delivery::DeliveryController;
pub use session::ConversationSession;
