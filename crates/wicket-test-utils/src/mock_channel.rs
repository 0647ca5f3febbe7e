// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock push channel for deterministic testing.
//!
//! `MockPushChannel` implements `PushChannel` with a settable connection
//! state, captured publishes, and per-conversation message injection that
//! mirrors the broker dispatching to subscription queues.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use wicket_core::error::WicketError;
use wicket_core::traits::PushChannel;
use wicket_core::types::{ChatMessage, ConnectionState, ConversationId};

/// A scripted stand-in for the broker connection.
pub struct MockPushChannel {
    state: Arc<watch::Sender<ConnectionState>>,
    published: Mutex<Vec<(ConversationId, String)>>,
    subscriptions: Mutex<HashMap<ConversationId, mpsc::Sender<ChatMessage>>>,
    fail_publish: AtomicBool,
    buffer: usize,
}

impl MockPushChannel {
    /// Creates a disconnected mock with a 16-message queue per subscription.
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state: Arc::new(state),
            published: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(HashMap::new()),
            fail_publish: AtomicBool::new(false),
            buffer: 16,
        }
    }

    /// Forces the observable connection state.
    pub fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Makes every `publish` fail with `ConnectionUnavailable`, regardless
    /// of state. Simulates the publish/disconnect race.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Everything passed to `publish`, in order.
    pub fn published(&self) -> Vec<(ConversationId, String)> {
        self.published.lock().expect("mock lock poisoned").clone()
    }

    /// Conversations with a live subscription.
    pub fn subscribed(&self) -> Vec<ConversationId> {
        let mut ids: Vec<_> = self
            .subscriptions
            .lock()
            .expect("mock lock poisoned")
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Delivers a message to the conversation's subscription queue, as the
    /// dispatcher would. Returns false when no subscription exists.
    pub async fn inject(&self, msg: ChatMessage) -> bool {
        let tx = {
            let subs = self.subscriptions.lock().expect("mock lock poisoned");
            subs.get(&msg.conversation_id).cloned()
        };
        match tx {
            Some(tx) => tx.send(msg).await.is_ok(),
            None => false,
        }
    }
}

impl Default for MockPushChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushChannel for MockPushChannel {
    async fn connect(&self) -> Result<(), WicketError> {
        self.set_state(ConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        self.subscriptions
            .lock()
            .expect("mock lock poisoned")
            .clear();
        self.set_state(ConnectionState::Disconnected);
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    async fn publish(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<(), WicketError> {
        if self.fail_publish.load(Ordering::SeqCst)
            || self.state() != ConnectionState::Connected
        {
            return Err(WicketError::ConnectionUnavailable {
                operation: "publish".into(),
            });
        }
        self.published
            .lock()
            .expect("mock lock poisoned")
            .push((conversation_id, content.to_string()));
        Ok(())
    }

    async fn subscribe(
        &self,
        conversation_id: ConversationId,
    ) -> Result<mpsc::Receiver<ChatMessage>, WicketError> {
        if self.state() != ConnectionState::Connected {
            return Err(WicketError::ConnectionUnavailable {
                operation: "subscribe".into(),
            });
        }
        let (tx, rx) = mpsc::channel(self.buffer);
        // Replacing drops the old sender, closing its queue.
        self.subscriptions
            .lock()
            .expect("mock lock poisoned")
            .insert(conversation_id, tx);
        Ok(rx)
    }

    async fn unsubscribe(&self, conversation_id: ConversationId) {
        self.subscriptions
            .lock()
            .expect("mock lock poisoned")
            .remove(&conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wicket_core::types::{MessageId, UserId};

    fn msg(conversation: i64) -> ChatMessage {
        ChatMessage {
            id: MessageId(1),
            conversation_id: ConversationId(conversation),
            sender_id: UserId(8),
            sender_name: "Sam".into(),
            content: "hello".into(),
            sent_at: chrono::Utc::now(),
            is_read: false,
        }
    }

    #[tokio::test]
    async fn inject_reaches_subscriber() {
        let channel = MockPushChannel::new();
        channel.connect().await.unwrap();
        let mut rx = channel.subscribe(ConversationId(5)).await.unwrap();

        assert!(channel.inject(msg(5)).await);
        assert_eq!(rx.recv().await.unwrap().conversation_id, ConversationId(5));
    }

    #[tokio::test]
    async fn inject_without_subscription_reports_false() {
        let channel = MockPushChannel::new();
        channel.connect().await.unwrap();
        assert!(!channel.inject(msg(5)).await);
    }

    #[tokio::test]
    async fn publish_requires_connected() {
        let channel = MockPushChannel::new();
        assert!(channel.publish(ConversationId(1), "x").await.is_err());

        channel.connect().await.unwrap();
        channel.publish(ConversationId(1), "x").await.unwrap();
        assert_eq!(channel.published().len(), 1);
    }

    #[tokio::test]
    async fn disconnect_clears_subscriptions() {
        let channel = MockPushChannel::new();
        channel.connect().await.unwrap();
        let _rx = channel.subscribe(ConversationId(5)).await.unwrap();

        channel.disconnect().await;
        assert!(channel.subscribed().is_empty());
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }
}
