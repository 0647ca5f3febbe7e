// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic subscription registry.
//!
//! Holds at most one live subscription handle per conversation. Each handle
//! owns a bounded sender feeding that conversation's inbound queue; the
//! subscriber holds the receiver. Dropping a handle closes the queue, so a
//! consumer observes invalidation as end-of-stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use wicket_core::types::{ChatMessage, ConversationId};

/// A live subscription: the broker-side subscription id plus the sender
/// half of the conversation's inbound queue.
struct SubscriptionHandle {
    sub_id: String,
    tx: mpsc::Sender<ChatMessage>,
}

/// Outcome of routing an inbound message to a subscription queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Queued on the conversation's inbound channel.
    Delivered,
    /// No live handle for the conversation; frame dropped.
    NoSubscriber,
    /// The consumer lagged past the queue capacity; frame dropped rather
    /// than blocking the read loop.
    QueueFull,
}

/// Registry of per-conversation subscription handles.
///
/// Uses a synchronous mutex: every operation completes without awaiting, so
/// state transitions are atomic with respect to the dispatch loop and the
/// lock is never held across a suspension point.
pub struct SubscriptionRegistry {
    inner: Mutex<HashMap<ConversationId, SubscriptionHandle>>,
    next_sub_id: AtomicU64,
    buffer: usize,
}

impl SubscriptionRegistry {
    /// Creates an empty registry whose queues hold `buffer` messages.
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            next_sub_id: AtomicU64::new(1),
            buffer,
        }
    }

    /// Registers a subscription for `conversation_id`, replacing any
    /// existing handle (the old queue is closed).
    ///
    /// Returns the new broker subscription id, the replaced subscription id
    /// if one existed, and the receiver half of the inbound queue.
    pub fn register(
        &self,
        conversation_id: ConversationId,
    ) -> (String, Option<String>, mpsc::Receiver<ChatMessage>) {
        let sub_id = format!("sub-{}", self.next_sub_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.buffer);

        let replaced = {
            let mut map = self.inner.lock().expect("registry lock poisoned");
            map.insert(
                conversation_id,
                SubscriptionHandle {
                    sub_id: sub_id.clone(),
                    tx,
                },
            )
            .map(|old| old.sub_id)
        };

        if replaced.is_some() {
            debug!(%conversation_id, "replaced existing subscription");
        }

        (sub_id, replaced, rx)
    }

    /// Removes the handle for `conversation_id`, returning its broker
    /// subscription id. No-op when absent.
    pub fn remove(&self, conversation_id: ConversationId) -> Option<String> {
        let mut map = self.inner.lock().expect("registry lock poisoned");
        map.remove(&conversation_id).map(|handle| handle.sub_id)
    }

    /// Invalidates every handle at once. Used on connection teardown, where
    /// no per-conversation UNSUBSCRIBE frames are possible or needed.
    pub fn clear(&self) {
        let mut map = self.inner.lock().expect("registry lock poisoned");
        if !map.is_empty() {
            debug!(count = map.len(), "clearing all subscriptions");
        }
        map.clear();
    }

    /// Routes an inbound message to the conversation's queue.
    pub fn route(&self, conversation_id: ConversationId, msg: ChatMessage) -> RouteOutcome {
        let map = self.inner.lock().expect("registry lock poisoned");
        match map.get(&conversation_id) {
            None => RouteOutcome::NoSubscriber,
            Some(handle) => match handle.tx.try_send(msg) {
                Ok(()) => RouteOutcome::Delivered,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%conversation_id, "inbound queue full, dropping frame");
                    RouteOutcome::QueueFull
                }
                // Receiver dropped but handle not yet removed: equivalent
                // to no subscriber.
                Err(mpsc::error::TrySendError::Closed(_)) => RouteOutcome::NoSubscriber,
            },
        }
    }

    /// True if a live handle exists for the conversation.
    pub fn contains(&self, conversation_id: ConversationId) -> bool {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .contains_key(&conversation_id)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
