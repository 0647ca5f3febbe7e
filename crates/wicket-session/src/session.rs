// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-viewer conversation session.
//!
//! Binds the push channel, the store, and the delivery controller to the
//! UI-facing state: which conversation is selected and its message list.
//! The session enforces the switch discipline -- unsubscribe the previous
//! conversation before subscribing the next -- so the registry never holds
//! more than the selected conversation's handle.
//!
//! Lifecycle is explicit: `start()` on session start, `shutdown()` on
//! session end. No ambient global connection exists.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use wicket_core::error::WicketError;
use wicket_core::traits::{ConversationStore, PushChannel, ViewerIdentity};
use wicket_core::types::{ChatMessage, ConnectionState, Conversation, ConversationId};

use crate::delivery::DeliveryController;

/// UI-facing state shared with the inbound consumer task.
struct SessionState {
    selected: Option<ConversationId>,
    messages: Vec<ChatMessage>,
}

struct ConsumerTask {
    conversation_id: ConversationId,
    handle: tokio::task::JoinHandle<()>,
}

/// Orchestrates one viewer's support-chat session.
pub struct ConversationSession {
    channel: Arc<dyn PushChannel>,
    store: Arc<dyn ConversationStore>,
    delivery: Arc<DeliveryController>,
    state: Arc<Mutex<SessionState>>,
    consumer: tokio::sync::Mutex<Option<ConsumerTask>>,
    /// Bumped whenever the message list changes, so a UI can watch for
    /// updates instead of polling.
    revision: Arc<watch::Sender<u64>>,
}

impl ConversationSession {
    pub fn new(
        channel: Arc<dyn PushChannel>,
        store: Arc<dyn ConversationStore>,
        identity: Arc<dyn ViewerIdentity>,
    ) -> Self {
        let delivery = Arc::new(DeliveryController::new(
            Arc::clone(&channel),
            Arc::clone(&store),
            identity,
        ));
        Self {
            channel,
            store,
            delivery,
            state: Arc::new(Mutex::new(SessionState {
                selected: None,
                messages: Vec::new(),
            })),
            consumer: tokio::sync::Mutex::new(None),
            revision: Arc::new(watch::channel(0).0),
        }
    }

    /// Starts the real-time channel. Sends still work before (or without)
    /// connectivity via the fallback path.
    pub async fn start(&self) -> Result<(), WicketError> {
        self.channel.connect().await
    }

    /// Ends the session: drops the active subscription and tears down the
    /// connection.
    pub async fn shutdown(&self) {
        self.clear_selection().await;
        self.channel.disconnect().await;
        info!("conversation session shut down");
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.channel.state_changes()
    }

    /// Watch handle that ticks whenever the message list changes.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// The store, for list/detail calls the UI makes directly.
    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn selected(&self) -> Option<ConversationId> {
        self.state.lock().expect("session state lock poisoned").selected
    }

    /// Snapshot of the message list in append order (best-effort ordering
    /// across the two delivery paths).
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state
            .lock()
            .expect("session state lock poisoned")
            .messages
            .clone()
    }

    /// Snapshot sorted by send timestamp, for renderers that want strict
    /// chronological order. Stable: same-timestamp rows keep append order.
    pub fn messages_sorted(&self) -> Vec<ChatMessage> {
        let mut messages = self.messages();
        messages.sort_by_key(|m| m.sent_at);
        messages
    }

    /// Selects a conversation: unsubscribes the previous one, loads its
    /// history, marks it read when it has unread messages, and subscribes
    /// to its topic for live updates.
    ///
    /// Returns the loaded history. A failed subscribe (channel down) is
    /// logged, not fatal: real-time updates are simply absent until
    /// reconnect.
    pub async fn select(&self, conversation: &Conversation) -> Result<Vec<ChatMessage>, WicketError> {
        self.drop_consumer().await;

        {
            let mut state = self.state.lock().expect("session state lock poisoned");
            state.selected = Some(conversation.id);
            state.messages.clear();
        }
        self.bump_revision();

        let history = self.store.list_messages(conversation.id).await?;
        {
            let mut state = self.state.lock().expect("session state lock poisoned");
            // Selection may have moved on while history loaded.
            if state.selected == Some(conversation.id) {
                state.messages = history.clone();
            }
        }
        self.bump_revision();

        if conversation.unread_count > 0 {
            if let Err(e) = self.store.mark_read(conversation.id).await {
                warn!(conversation_id = %conversation.id, error = %e, "mark-read failed");
            }
        }

        match self.channel.subscribe(conversation.id).await {
            Ok(rx) => {
                self.spawn_consumer(conversation.id, rx).await;
            }
            Err(WicketError::ConnectionUnavailable { .. }) => {
                warn!(
                    conversation_id = %conversation.id,
                    "not subscribed: real-time channel unavailable"
                );
            }
            Err(e) => {
                warn!(conversation_id = %conversation.id, error = %e, "subscribe failed");
            }
        }

        Ok(history)
    }

    /// Sends to the selected conversation and appends the resulting row
    /// (optimistic or authoritative). On failure nothing is appended.
    pub async fn send(&self, content: &str) -> Result<ChatMessage, WicketError> {
        let conversation_id = self.selected().ok_or_else(|| {
            WicketError::Internal("no conversation selected".into())
        })?;

        let msg = self.delivery.send(conversation_id, content).await?;

        {
            let mut state = self.state.lock().expect("session state lock poisoned");
            if state.selected == Some(conversation_id) {
                state.messages.push(msg.clone());
            }
        }
        self.bump_revision();
        Ok(msg)
    }

    /// Returns to the conversation list: unsubscribes and clears the
    /// selected conversation's state.
    pub async fn clear_selection(&self) {
        self.drop_consumer().await;
        {
            let mut state = self.state.lock().expect("session state lock poisoned");
            state.selected = None;
            state.messages.clear();
        }
        self.bump_revision();
    }

    async fn drop_consumer(&self) {
        let mut guard = self.consumer.lock().await;
        if let Some(prev) = guard.take() {
            self.channel.unsubscribe(prev.conversation_id).await;
            prev.handle.abort();
            debug!(conversation_id = %prev.conversation_id, "left conversation topic");
        }
    }

    async fn spawn_consumer(
        &self,
        conversation_id: ConversationId,
        mut rx: tokio::sync::mpsc::Receiver<ChatMessage>,
    ) {
        let state = Arc::clone(&self.state);
        let delivery = Arc::clone(&self.delivery);
        let revision = Arc::clone(&self.revision);

        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let Some(msg) = delivery.filter_inbound(msg) else {
                    continue;
                };
                {
                    let mut state = state.lock().expect("session state lock poisoned");
                    // Guard against a frame racing a conversation switch.
                    if state.selected != Some(conversation_id) {
                        continue;
                    }
                    state.messages.push(msg);
                }
                revision.send_modify(|rev| *rev += 1);
            }
            debug!(%conversation_id, "inbound consumer finished");
        });

        let mut guard = self.consumer.lock().await;
        *guard = Some(ConsumerTask {
            conversation_id,
            handle,
        });
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        // Best-effort: keep the consumer task from outliving the session.
        if let Ok(mut guard) = self.consumer.try_lock()
            && let Some(task) = guard.take()
        {
            task.handle.abort();
        }
    }
}
