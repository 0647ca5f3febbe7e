// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock conversation store for deterministic testing.
//!
//! `MockStore` implements `ConversationStore` with scripted histories,
//! recorded calls for assertions, and a failure switch for exercising the
//! persistence-error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use wicket_core::error::WicketError;
use wicket_core::traits::ConversationStore;
use wicket_core::types::{
    ChatMessage, Conversation, ConversationId, ConversationStatus, MessageId, UserId,
};

/// A scripted stand-in for the backend REST API.
pub struct MockStore {
    histories: Mutex<HashMap<ConversationId, Vec<ChatMessage>>>,
    conversations: Mutex<Vec<Conversation>>,
    create_calls: Mutex<Vec<(ConversationId, String)>>,
    mark_read_calls: Mutex<Vec<ConversationId>>,
    fail_create: AtomicBool,
    /// Server-assigned ids start high so they never collide with scripted
    /// history rows.
    next_id: AtomicI64,
    author: UserId,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            histories: Mutex::new(HashMap::new()),
            conversations: Mutex::new(Vec::new()),
            create_calls: Mutex::new(Vec::new()),
            mark_read_calls: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
            next_id: AtomicI64::new(501),
            author: UserId(7),
        }
    }

    /// Sets the sender id stamped on rows created via `create_message`.
    pub fn with_author(mut self, author: UserId) -> Self {
        self.author = author;
        self
    }

    /// Seeds a conversation's message history.
    pub fn seed_history(&self, conversation_id: ConversationId, messages: Vec<ChatMessage>) {
        self.histories
            .lock()
            .expect("mock lock poisoned")
            .insert(conversation_id, messages);
    }

    /// Seeds the conversation list.
    pub fn seed_conversation(&self, conversation: Conversation) {
        self.conversations
            .lock()
            .expect("mock lock poisoned")
            .push(conversation);
    }

    /// Makes `create_message` fail with a persistence error.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Every `create_message` call, in order.
    pub fn create_calls(&self) -> Vec<(ConversationId, String)> {
        self.create_calls.lock().expect("mock lock poisoned").clone()
    }

    /// Every `mark_read` call, in order.
    pub fn mark_read_calls(&self) -> Vec<ConversationId> {
        self.mark_read_calls
            .lock()
            .expect("mock lock poisoned")
            .clone()
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a plausible conversation row for tests.
pub fn sample_conversation(id: i64, unread: u32) -> Conversation {
    Conversation {
        id: ConversationId(id),
        subject: format!("Ticket #{id}"),
        customer_id: UserId(7),
        customer_name: "Ada".into(),
        employee_id: Some(UserId(8)),
        employee_name: Some("Sam".into()),
        status: ConversationStatus::Open,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        unread_count: unread,
        messages: None,
    }
}

/// Builds a plausible inbound message row for tests.
pub fn sample_message(id: i64, conversation: i64, sender: i64, content: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId(id),
        conversation_id: ConversationId(conversation),
        sender_id: UserId(sender),
        sender_name: if sender == 7 { "Ada" } else { "Sam" }.into(),
        content: content.into(),
        sent_at: Utc::now(),
        is_read: false,
    }
}

#[async_trait]
impl ConversationStore for MockStore {
    async fn create_message(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<ChatMessage, WicketError> {
        self.create_calls
            .lock()
            .expect("mock lock poisoned")
            .push((conversation_id, content.to_string()));

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(WicketError::Persistence {
                message: "message not sent".into(),
                source: None,
            });
        }

        let msg = ChatMessage {
            id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            conversation_id,
            sender_id: self.author,
            sender_name: "Ada".into(),
            content: content.to_string(),
            sent_at: Utc::now(),
            is_read: false,
        };
        self.histories
            .lock()
            .expect("mock lock poisoned")
            .entry(conversation_id)
            .or_default()
            .push(msg.clone());
        Ok(msg)
    }

    async fn mark_read(&self, conversation_id: ConversationId) -> Result<(), WicketError> {
        self.mark_read_calls
            .lock()
            .expect("mock lock poisoned")
            .push(conversation_id);
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ChatMessage>, WicketError> {
        Ok(self
            .histories
            .lock()
            .expect("mock lock poisoned")
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, WicketError> {
        Ok(self.conversations.lock().expect("mock lock poisoned").clone())
    }

    async fn list_unassigned(&self) -> Result<Vec<Conversation>, WicketError> {
        Ok(self
            .conversations
            .lock()
            .expect("mock lock poisoned")
            .iter()
            .filter(|c| c.employee_id.is_none())
            .cloned()
            .collect())
    }

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, WicketError> {
        self.conversations
            .lock()
            .expect("mock lock poisoned")
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| WicketError::Persistence {
                message: format!("conversation {id} not found"),
                source: None,
            })
    }

    async fn create_conversation(&self, subject: &str) -> Result<Conversation, WicketError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let conversation = Conversation {
            id: ConversationId(id),
            subject: subject.to_string(),
            customer_id: self.author,
            customer_name: "Ada".into(),
            employee_id: None,
            employee_name: None,
            status: ConversationStatus::Open,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            unread_count: 0,
            messages: None,
        };
        self.conversations
            .lock()
            .expect("mock lock poisoned")
            .push(conversation.clone());
        Ok(conversation)
    }

    async fn assign_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, WicketError> {
        let mut conversations = self.conversations.lock().expect("mock lock poisoned");
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| WicketError::Persistence {
                message: format!("conversation {id} not found"),
                source: None,
            })?;
        conversation.employee_id = Some(UserId(8));
        conversation.employee_name = Some("Sam".into());
        Ok(conversation.clone())
    }

    async fn close_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, WicketError> {
        let mut conversations = self.conversations.lock().expect("mock lock poisoned");
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| WicketError::Persistence {
                message: format!("conversation {id} not found"),
                source: None,
            })?;
        conversation.status = ConversationStatus::Closed;
        Ok(conversation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_message_assigns_server_ids() {
        let store = MockStore::new();
        let first = store.create_message(ConversationId(9), "a").await.unwrap();
        let second = store.create_message(ConversationId(9), "b").await.unwrap();
        assert_eq!(first.id.0, 501);
        assert_eq!(second.id.0, 502);
        assert_eq!(store.create_calls().len(), 2);
    }

    #[tokio::test]
    async fn fail_creates_surfaces_persistence_error() {
        let store = MockStore::new();
        store.fail_creates(true);
        let err = store
            .create_message(ConversationId(9), "a")
            .await
            .unwrap_err();
        assert!(err.is_user_visible());
        // The call is still recorded: exactly one backend attempt happened.
        assert_eq!(store.create_calls().len(), 1);
    }

    #[tokio::test]
    async fn seeded_history_round_trips() {
        let store = MockStore::new();
        store.seed_history(
            ConversationId(5),
            vec![sample_message(1, 5, 8, "hello")],
        );
        let history = store.list_messages(ConversationId(5)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let store = MockStore::new();
        let created = store.create_conversation("Ticket").await.unwrap();
        assert_eq!(created.status, ConversationStatus::Open);

        let closed = store.close_conversation(created.id).await.unwrap();
        assert!(closed.status.is_terminal());
    }
}
