// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness assembling a full conversation session over mocks.
//!
//! `TestHarness` wires a [`MockPushChannel`], a [`MockStore`], and a static
//! viewer identity into a [`ConversationSession`], keeping the concrete
//! mock handles public for assertions.

use std::sync::Arc;

use wicket_core::traits::{CredentialProvider, ViewerIdentity};
use wicket_core::types::{ChatMessage, ConnectionState, Conversation, ConversationId, UserId};
use wicket_session::ConversationSession;

use crate::mock_channel::MockPushChannel;
use crate::mock_store::MockStore;

/// Fixed credential provider for tests.
pub struct StaticCredentials(pub Option<String>);

impl CredentialProvider for StaticCredentials {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Fixed viewer identity for tests.
pub struct StaticIdentity {
    pub user_id: Option<UserId>,
    pub name: String,
}

impl ViewerIdentity for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

/// Builder for a session test environment.
pub struct TestHarnessBuilder {
    viewer: UserId,
    connected: bool,
    histories: Vec<(ConversationId, Vec<ChatMessage>)>,
    conversations: Vec<Conversation>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            viewer: UserId(7),
            connected: true,
            histories: Vec::new(),
            conversations: Vec::new(),
        }
    }

    /// Sets the viewing user (default 7).
    pub fn with_viewer(mut self, viewer: UserId) -> Self {
        self.viewer = viewer;
        self
    }

    /// Starts the harness with the push channel disconnected.
    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// Seeds a conversation's history in the store.
    pub fn with_history(
        mut self,
        conversation_id: ConversationId,
        messages: Vec<ChatMessage>,
    ) -> Self {
        self.histories.push((conversation_id, messages));
        self
    }

    /// Seeds the conversation list.
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversations.push(conversation);
        self
    }

    pub fn build(self) -> TestHarness {
        let channel = Arc::new(MockPushChannel::new());
        if self.connected {
            channel.set_state(ConnectionState::Connected);
        }

        let store = Arc::new(MockStore::new().with_author(self.viewer));
        for (id, messages) in self.histories {
            store.seed_history(id, messages);
        }
        for conversation in self.conversations {
            store.seed_conversation(conversation);
        }

        let identity = Arc::new(StaticIdentity {
            user_id: Some(self.viewer),
            name: "me".into(),
        });

        let session = ConversationSession::new(
            channel.clone(),
            store.clone(),
            identity,
        );

        TestHarness {
            channel,
            store,
            session,
        }
    }
}

/// A complete session environment over mocks.
pub struct TestHarness {
    /// The mock push channel (settable state, captured publishes).
    pub channel: Arc<MockPushChannel>,
    /// The mock store (scripted histories, recorded calls).
    pub store: Arc<MockStore>,
    /// The session under test.
    pub session: ConversationSession,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Injects an inbound push and yields so the consumer task runs.
    pub async fn push_inbound(&self, msg: ChatMessage) -> bool {
        let delivered = self.channel.inject(msg).await;
        // Give the consumer task a chance to drain the queue.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        delivered
    }
}
