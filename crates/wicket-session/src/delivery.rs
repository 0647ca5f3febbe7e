// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The send path: push-channel publish with optimistic insertion, or the
//! synchronous store fallback when the real-time channel is down.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use wicket_core::error::WicketError;
use wicket_core::traits::{ConversationStore, PushChannel, ViewerIdentity};
use wicket_core::types::{ChatMessage, ConnectionState, ConversationId, MessageId};

/// Chooses the delivery path for outbound messages and reconciles inbound
/// pushes against the viewer's own optimistic insertions.
pub struct DeliveryController {
    channel: Arc<dyn PushChannel>,
    store: Arc<dyn ConversationStore>,
    identity: Arc<dyn ViewerIdentity>,
    /// Session-unique placeholder ids, counting down from -1. Server ids
    /// are positive, so a placeholder can never collide with a real id and
    /// is never reused as one.
    next_local_id: AtomicI64,
}

impl DeliveryController {
    pub fn new(
        channel: Arc<dyn PushChannel>,
        store: Arc<dyn ConversationStore>,
        identity: Arc<dyn ViewerIdentity>,
    ) -> Self {
        Self {
            channel,
            store,
            identity,
            next_local_id: AtomicI64::new(-1),
        }
    }

    fn next_local_id(&self) -> MessageId {
        MessageId(self.next_local_id.fetch_sub(1, Ordering::Relaxed))
    }

    /// Sends a message so that exactly one visible copy ends up in the
    /// conversation's list.
    ///
    /// Connected: publish over the push channel, return an optimistic row
    /// immediately (the broker's echo of it is suppressed by
    /// [`filter_inbound`](Self::filter_inbound)). Otherwise: one
    /// `create_message` call against the store; the authoritative row is
    /// returned on success and nothing is appended on failure.
    ///
    /// A publish that races the connection dropping falls through to the
    /// fallback, so a submitted message is never lost.
    pub async fn send(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<ChatMessage, WicketError> {
        if self.channel.state() == ConnectionState::Connected {
            match self.channel.publish(conversation_id, content).await {
                Ok(()) => {
                    let viewer = self.identity.current_user_id().ok_or_else(|| {
                        WicketError::Internal("no authenticated viewer for send".into())
                    })?;
                    return Ok(ChatMessage {
                        id: self.next_local_id(),
                        conversation_id,
                        sender_id: viewer,
                        sender_name: self.identity.display_name(),
                        content: content.to_string(),
                        sent_at: Utc::now(),
                        is_read: false,
                    });
                }
                Err(WicketError::ConnectionUnavailable { .. }) => {
                    debug!(%conversation_id, "publish raced a disconnect, using fallback");
                }
                Err(e) => return Err(e),
            }
        }

        self.store.create_message(conversation_id, content).await
    }

    /// Applies self-message suppression to an inbound push.
    ///
    /// The broker echoes every persisted message to all topic subscribers,
    /// including the sender; the sender already displayed it optimistically,
    /// so their own echo is discarded here. The dispatcher cannot do this --
    /// it has no notion of who is viewing.
    pub fn filter_inbound(&self, msg: ChatMessage) -> Option<ChatMessage> {
        if let Some(viewer) = self.identity.current_user_id()
            && msg.sender_id == viewer
        {
            debug!(
                conversation_id = %msg.conversation_id,
                "suppressing echo of self-sent message"
            );
            return None;
        }
        Some(msg)
    }
}
