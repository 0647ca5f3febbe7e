// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound MESSAGE frame dispatch.
//!
//! Decodes broker MESSAGE frames into [`ChatMessage`] values and routes
//! them to the subscribed conversation's queue. Malformed or unrouted
//! frames are logged and dropped; nothing here may break the read loop.

use tracing::{debug, warn};

use wicket_core::types::ChatMessage;

use crate::frame::{self, Frame};
use crate::registry::{RouteOutcome, SubscriptionRegistry};

/// Decodes and routes one MESSAGE frame. Self-sent messages are NOT
/// filtered here: the dispatcher has no notion of who is viewing, so echo
/// suppression belongs to the delivery layer.
pub fn dispatch_message(registry: &SubscriptionRegistry, frame: &Frame) {
    let Some(destination) = frame.get_header("destination") else {
        debug!("dropping MESSAGE frame without destination header");
        return;
    };

    let Some(conversation_id) = frame::conversation_from_topic(destination) else {
        debug!(destination, "dropping MESSAGE frame for unrecognized destination");
        return;
    };

    let msg: ChatMessage = match serde_json::from_str(&frame.body) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(
                %conversation_id,
                error = %e,
                "dropping undecodable message payload"
            );
            return;
        }
    };

    match registry.route(conversation_id, msg) {
        RouteOutcome::Delivered => {}
        RouteOutcome::NoSubscriber => {
            // Conversation not currently open, or a frame raced a local
            // unsubscribe; both are expected.
            debug!(%conversation_id, "no subscriber for inbound message, dropping");
        }
        RouteOutcome::QueueFull => {
            // Already logged by the registry with the conversation id.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Command;
    use wicket_core::types::ConversationId;

    fn message_frame(destination: &str, body: &str) -> Frame {
        Frame::new(Command::Message)
            .header("destination", destination)
            .header("subscription", "sub-1")
            .header("message-id", "m-1")
            .body(body)
    }

    fn wire_body(conversation: i64, sender: i64, content: &str) -> String {
        format!(
            r#"{{"id":100,"conversationId":{conversation},"senderId":{sender},"senderName":"Sam","content":"{content}","sentAt":"2026-01-15T10:00:00Z","isRead":false}}"#
        )
    }

    #[test]
    fn routes_decoded_message_to_subscriber() {
        let registry = SubscriptionRegistry::new(4);
        let (_, _, mut rx) = registry.register(ConversationId(5));

        let frame = message_frame("/topic/conversation/5", &wire_body(5, 8, "hello"));
        dispatch_message(&registry, &frame);

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.conversation_id, ConversationId(5));
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.sender_id.0, 8);
    }

    #[test]
    fn drops_frame_without_destination() {
        let registry = SubscriptionRegistry::new(4);
        let (_, _, mut rx) = registry.register(ConversationId(5));

        let frame = Frame::new(Command::Message).body(wire_body(5, 8, "hi"));
        dispatch_message(&registry, &frame);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn drops_frame_for_unsubscribed_conversation() {
        let registry = SubscriptionRegistry::new(4);
        let (_, _, mut rx) = registry.register(ConversationId(5));

        let frame = message_frame("/topic/conversation/6", &wire_body(6, 8, "hi"));
        dispatch_message(&registry, &frame);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    #[tracing_test::traced_test]
    fn malformed_payload_never_reaches_subscriber() {
        let registry = SubscriptionRegistry::new(4);
        let (_, _, mut rx) = registry.register(ConversationId(5));

        let frame = message_frame("/topic/conversation/5", "{not json");
        dispatch_message(&registry, &frame);
        assert!(rx.try_recv().is_err());
        assert!(logs_contain("dropping undecodable message payload"));

        // The dispatcher keeps working for subsequent well-formed frames.
        let frame = message_frame("/topic/conversation/5", &wire_body(5, 8, "after"));
        dispatch_message(&registry, &frame);
        assert_eq!(rx.try_recv().unwrap().content, "after");
    }
}
