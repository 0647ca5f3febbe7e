// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store trait: the persistence collaborator behind the
//! fallback send path, history loading, and conversation lifecycle calls.

use async_trait::async_trait;

use crate::error::WicketError;
use crate::types::{ChatMessage, Conversation, ConversationId};

/// The remote persistence backend for conversations and messages.
///
/// Wicket never persists anything locally; every durable operation goes
/// through this seam. `create_message` doubles as the synchronous fallback
/// send path when the real-time channel is down.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persists a message and returns the authoritative row (server id,
    /// server timestamp). Exactly one backend call per invocation.
    async fn create_message(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<ChatMessage, WicketError>;

    /// Marks every message in the conversation as read for the viewer.
    async fn mark_read(&self, conversation_id: ConversationId) -> Result<(), WicketError>;

    /// Full ordered message history for a conversation.
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ChatMessage>, WicketError>;

    /// Conversations visible to the viewer.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, WicketError>;

    /// Conversations not yet assigned to any employee.
    async fn list_unassigned(&self) -> Result<Vec<Conversation>, WicketError>;

    /// Single conversation detail.
    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, WicketError>;

    /// Opens a new conversation with the given subject.
    async fn create_conversation(&self, subject: &str) -> Result<Conversation, WicketError>;

    /// Assigns the conversation to the calling employee.
    async fn assign_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, WicketError>;

    /// Closes the conversation. Terminal: no further sends are accepted.
    async fn close_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, WicketError>;
}
