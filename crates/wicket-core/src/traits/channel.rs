// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push channel trait: the real-time delivery seam between the session
//! layer and the broker connection.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::error::WicketError;
use crate::types::{ChatMessage, ConnectionState, ConversationId};

/// The real-time message channel to the broker.
///
/// One logical connection per session; per-conversation subscriptions hand
/// back a bounded receiver that preserves the broker's per-topic delivery
/// order. Implementations must keep `subscribe` exclusive: subscribing to a
/// conversation that already has a live subscription replaces it.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Establishes the logical broker session. Idempotent: a no-op while
    /// already connecting or connected.
    async fn connect(&self) -> Result<(), WicketError>;

    /// Tears down the session and invalidates every subscription. Idempotent.
    async fn disconnect(&self);

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Watch handle for observing state transitions.
    fn state_changes(&self) -> watch::Receiver<ConnectionState>;

    /// Publishes a chat message to the conversation's send destination.
    ///
    /// Requires [`ConnectionState::Connected`]; fails with
    /// [`WicketError::ConnectionUnavailable`] otherwise.
    async fn publish(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<(), WicketError>;

    /// Subscribes to the conversation's topic, returning the inbound
    /// message stream. Replaces any existing subscription for the same
    /// conversation.
    async fn subscribe(
        &self,
        conversation_id: ConversationId,
    ) -> Result<mpsc::Receiver<ChatMessage>, WicketError>;

    /// Drops the subscription for the conversation, if present.
    async fn unsubscribe(&self, conversation_id: ConversationId);
}
