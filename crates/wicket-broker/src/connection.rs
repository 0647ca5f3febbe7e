// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The logical broker connection.
//!
//! [`BrokerConnection`] owns a single STOMP session over WebSocket: connect
//! and handshake with the bearer credential attached as a CONNECT header,
//! a supervisor task that reconnects on a fixed delay until told to stop,
//! and the publish/subscribe surface the session layer consumes.
//!
//! The connection is an explicitly owned object: construct it once per
//! session, inject it where needed, and `disconnect()` on session end.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wicket_config::model::BrokerConfig;
use wicket_core::error::WicketError;
use wicket_core::traits::{CredentialProvider, PushChannel};
use wicket_core::types::{ChatMessage, ConnectionState, ConversationId, OutboundChat};

use crate::dispatch;
use crate::frame::{self, Command, Frame};
use crate::registry::SubscriptionRegistry;

/// A single logical connection to the support broker.
pub struct BrokerConnection {
    config: BrokerConfig,
    credentials: Arc<dyn CredentialProvider>,
    registry: Arc<SubscriptionRegistry>,
    state: Arc<watch::Sender<ConnectionState>>,
    outbound: Arc<StdMutex<Option<mpsc::UnboundedSender<Frame>>>>,
    supervisor: tokio::sync::Mutex<Option<Supervisor>>,
}

struct Supervisor {
    handle: tokio::task::JoinHandle<()>,
    shutdown: CancellationToken,
}

/// Everything the supervisor task needs, cloned out of the connection so
/// the task owns its context.
struct SupervisorCtx {
    config: BrokerConfig,
    token: String,
    registry: Arc<SubscriptionRegistry>,
    state: Arc<watch::Sender<ConnectionState>>,
    outbound: Arc<StdMutex<Option<mpsc::UnboundedSender<Frame>>>>,
    shutdown: CancellationToken,
}

/// Why an established session ended.
enum SessionEnd {
    /// `disconnect()` was called; do not reconnect.
    Shutdown,
    /// Network loss, close frame, or broker ERROR; reconnect after delay.
    ConnectionLost,
}

impl BrokerConnection {
    pub fn new(config: BrokerConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new(config.subscription_buffer));
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            credentials,
            registry,
            state: Arc::new(state_tx),
            outbound: Arc::new(StdMutex::new(None)),
            supervisor: tokio::sync::Mutex::new(None),
        }
    }

    /// Number of live subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.registry.len()
    }

    /// True if the conversation currently has a live subscription handle.
    pub fn is_subscribed(&self, conversation_id: ConversationId) -> bool {
        self.registry.contains(conversation_id)
    }

    /// Enqueues a frame on the current session's writer.
    fn send_frame(&self, frame: Frame) -> Result<(), WicketError> {
        let operation = frame.command.as_str().to_ascii_lowercase();
        let guard = self.outbound.lock().expect("outbound lock poisoned");
        match guard.as_ref() {
            Some(tx) => tx
                .send(frame)
                .map_err(|_| WicketError::ConnectionUnavailable { operation }),
            None => Err(WicketError::ConnectionUnavailable { operation }),
        }
    }
}

#[async_trait]
impl PushChannel for BrokerConnection {
    /// Starts the connection supervisor. Idempotent: calling while a
    /// supervisor is already running (connecting or connected) is a no-op.
    /// An absent credential means no attempt is made.
    async fn connect(&self) -> Result<(), WicketError> {
        let mut guard = self.supervisor.lock().await;
        if let Some(sup) = guard.as_ref()
            && !sup.handle.is_finished()
        {
            debug!("connect requested while already active, ignoring");
            return Ok(());
        }

        let Some(token) = self.credentials.token() else {
            warn!("no credential available, not connecting to broker");
            return Ok(());
        };

        let shutdown = CancellationToken::new();
        let ctx = SupervisorCtx {
            config: self.config.clone(),
            token,
            registry: Arc::clone(&self.registry),
            state: Arc::clone(&self.state),
            outbound: Arc::clone(&self.outbound),
            shutdown: shutdown.clone(),
        };
        let handle = tokio::spawn(run_supervisor(ctx));
        *guard = Some(Supervisor { handle, shutdown });
        Ok(())
    }

    /// Stops the supervisor, invalidates every subscription, and settles
    /// on DISCONNECTED. Idempotent.
    async fn disconnect(&self) {
        let mut guard = self.supervisor.lock().await;
        if let Some(sup) = guard.take() {
            sup.shutdown.cancel();
            // A supervisor mid-dial can take up to connect_timeout to
            // notice the cancellation; abort rather than wait it out. The
            // cleanup below must not race a still-running task.
            let abort = sup.handle.abort_handle();
            if timeout(Duration::from_secs(2), sup.handle).await.is_err() {
                warn!("broker supervisor did not stop in time, aborting");
                abort.abort();
            }
        }
        *self.outbound.lock().expect("outbound lock poisoned") = None;
        self.registry.clear();
        set_state(&self.state, ConnectionState::Disconnected);
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Publishes a chat payload to the conversation's send destination.
    /// The broker persists and re-broadcasts; no acknowledgment is awaited.
    async fn publish(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<(), WicketError> {
        if self.state() != ConnectionState::Connected {
            return Err(WicketError::ConnectionUnavailable {
                operation: "publish".into(),
            });
        }

        let payload = serde_json::to_string(&OutboundChat {
            conversation_id,
            content: content.to_string(),
        })
        .map_err(|e| WicketError::Internal(format!("failed to encode send payload: {e}")))?;

        self.send_frame(frame::send_frame(
            &frame::send_destination(conversation_id),
            payload,
        ))
    }

    /// Subscribes to the conversation's topic. An existing handle for the
    /// same conversation is replaced (old one unsubscribed first).
    async fn subscribe(
        &self,
        conversation_id: ConversationId,
    ) -> Result<mpsc::Receiver<ChatMessage>, WicketError> {
        if self.state() != ConnectionState::Connected {
            warn!(%conversation_id, "subscribe requested while not connected");
            return Err(WicketError::ConnectionUnavailable {
                operation: "subscribe".into(),
            });
        }

        let (sub_id, replaced, rx) = self.registry.register(conversation_id);
        if let Some(old_sub_id) = replaced {
            // Best-effort: the broker-side subscription dies with the
            // connection anyway if this frame cannot be sent.
            let _ = self.send_frame(frame::unsubscribe_frame(&old_sub_id));
        }

        match self.send_frame(frame::subscribe_frame(
            &sub_id,
            &frame::topic_destination(conversation_id),
        )) {
            Ok(()) => {
                debug!(%conversation_id, %sub_id, "subscribed to conversation topic");
                Ok(rx)
            }
            Err(e) => {
                // The session dropped between the state check and the send.
                self.registry.remove(conversation_id);
                Err(e)
            }
        }
    }

    /// Removes the conversation's subscription, if present.
    async fn unsubscribe(&self, conversation_id: ConversationId) {
        if let Some(sub_id) = self.registry.remove(conversation_id) {
            debug!(%conversation_id, %sub_id, "unsubscribed from conversation topic");
            if self.state() == ConnectionState::Connected {
                let _ = self.send_frame(frame::unsubscribe_frame(&sub_id));
            }
        }
    }
}

/// Publishes a state transition, suppressing duplicate notifications.
fn set_state(state: &watch::Sender<ConnectionState>, next: ConnectionState) {
    state.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            debug!(from = %current, to = %next, "connection state change");
            *current = next;
            true
        }
    });
}

/// Connection supervisor: one connect attempt per cycle, fixed delay
/// between cycles, forever until shutdown. Not exponential backoff: the
/// broker is a single trusted internal endpoint.
async fn run_supervisor(ctx: SupervisorCtx) {
    let reconnect_delay = Duration::from_secs(ctx.config.reconnect_delay_secs);

    loop {
        set_state(&ctx.state, ConnectionState::Connecting);

        match run_session(&ctx).await {
            // disconnect() owns cleanup on the shutdown path; touching the
            // shared slots here would race a subsequent connect().
            Ok(SessionEnd::Shutdown) => return,
            Ok(SessionEnd::ConnectionLost) => {
                warn!("broker connection lost, will reconnect");
            }
            Err(e) => {
                warn!(error = %e, "broker connect attempt failed");
            }
        }

        if ctx.shutdown.is_cancelled() {
            return;
        }
        teardown(&ctx);

        debug!(
            delay_secs = ctx.config.reconnect_delay_secs,
            "waiting before reconnect attempt"
        );
        tokio::select! {
            _ = ctx.shutdown.cancelled() => return,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
}

fn teardown(ctx: &SupervisorCtx) {
    *ctx.outbound.lock().expect("outbound lock poisoned") = None;
    ctx.registry.clear();
    set_state(&ctx.state, ConnectionState::Disconnected);
}

/// One connect attempt: WebSocket dial, STOMP handshake, then the session
/// read/write loop until loss or shutdown.
async fn run_session(ctx: &SupervisorCtx) -> Result<SessionEnd, WicketError> {
    let connect_timeout = Duration::from_secs(ctx.config.connect_timeout_secs);

    let (ws, _) = timeout(connect_timeout, connect_async(ctx.config.url.as_str()))
        .await
        .map_err(|_| WicketError::Protocol {
            message: format!("connect to {} timed out", ctx.config.url),
            source: None,
        })?
        .map_err(|e| WicketError::Protocol {
            message: format!("websocket connect failed: {e}"),
            source: Some(Box::new(e)),
        })?;

    let (mut sink, mut stream) = ws.split();

    // STOMP handshake: credential goes in the CONNECT frame, once.
    let connect = frame::connect_frame(&ctx.token, &host_of(&ctx.config.url));
    sink.send(WsMessage::Text(connect.encode().into()))
        .await
        .map_err(|e| WicketError::Protocol {
            message: format!("failed to send CONNECT frame: {e}"),
            source: Some(Box::new(e)),
        })?;

    timeout(connect_timeout, await_connected(&mut stream))
        .await
        .map_err(|_| WicketError::Protocol {
            message: "STOMP handshake timed out".into(),
            source: None,
        })??;

    // A shutdown may have landed while the handshake was in flight; do not
    // install a writer that disconnect() has already cleaned up.
    if ctx.shutdown.is_cancelled() {
        return Ok(SessionEnd::Shutdown);
    }

    // Session established: install the writer, then announce CONNECTED.
    let (tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();
    *ctx.outbound.lock().expect("outbound lock poisoned") = Some(tx);
    set_state(&ctx.state, ConnectionState::Connected);
    info!(url = %ctx.config.url, "broker session established");

    loop {
        tokio::select! {
            _ = ctx.shutdown.cancelled() => {
                let _ = sink
                    .send(WsMessage::Text(frame::disconnect_frame().encode().into()))
                    .await;
                let _ = sink.close().await;
                return Ok(SessionEnd::Shutdown);
            }
            outgoing = outbound_rx.recv() => {
                let Some(frame) = outgoing else {
                    return Ok(SessionEnd::ConnectionLost);
                };
                if sink
                    .send(WsMessage::Text(frame.encode().into()))
                    .await
                    .is_err()
                {
                    return Ok(SessionEnd::ConnectionLost);
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let FrameAction::ProtocolError = handle_text(ctx, text.as_str()) {
                            return Ok(SessionEnd::ConnectionLost);
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        return Ok(SessionEnd::ConnectionLost);
                    }
                    // Ping/pong handled by tungstenite; binary is not part
                    // of the protocol.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket read error");
                        return Ok(SessionEnd::ConnectionLost);
                    }
                }
            }
        }
    }
}

enum FrameAction {
    Continue,
    ProtocolError,
}

/// Handles one inbound text message during an established session.
fn handle_text(ctx: &SupervisorCtx, text: &str) -> FrameAction {
    // Bare EOL is a STOMP heart-beat.
    if text
        .trim_matches(|c| c == '\n' || c == '\r' || c == '\0')
        .is_empty()
    {
        return FrameAction::Continue;
    }

    match Frame::decode(text) {
        Err(e) => {
            warn!(error = %e, "dropping undecodable frame");
            FrameAction::Continue
        }
        Ok(frame) => match frame.command {
            Command::Message => {
                dispatch::dispatch_message(&ctx.registry, &frame);
                FrameAction::Continue
            }
            Command::Error => {
                error!(
                    message = frame.get_header("message").unwrap_or_default(),
                    body = %frame.body,
                    "broker error frame, tearing down connection"
                );
                FrameAction::ProtocolError
            }
            Command::Receipt => {
                debug!(receipt = frame.get_header("receipt-id").unwrap_or_default(), "receipt");
                FrameAction::Continue
            }
            other => {
                debug!(command = %other, "ignoring unexpected frame");
                FrameAction::Continue
            }
        },
    }
}

/// Waits for the broker's CONNECTED frame, treating ERROR as rejection.
async fn await_connected<S>(stream: &mut S) -> Result<(), WicketError>
where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => {
                if text
                    .trim_matches(|c: char| c == '\n' || c == '\r' || c == '\0')
                    .is_empty()
                {
                    continue;
                }
                let frame = Frame::decode(text.as_str())?;
                match frame.command {
                    Command::Connected => return Ok(()),
                    Command::Error => {
                        return Err(WicketError::Protocol {
                            message: format!(
                                "broker rejected connection: {}",
                                frame.get_header("message").unwrap_or(&frame.body)
                            ),
                            source: None,
                        });
                    }
                    other => {
                        debug!(command = %other, "ignoring pre-handshake frame");
                    }
                }
            }
            Ok(WsMessage::Close(_)) => {
                return Err(WicketError::Protocol {
                    message: "connection closed during STOMP handshake".into(),
                    source: None,
                });
            }
            Ok(_) => {}
            Err(e) => {
                return Err(WicketError::Protocol {
                    message: format!("websocket error during handshake: {e}"),
                    source: Some(Box::new(e)),
                });
            }
        }
    }
    Err(WicketError::Protocol {
        message: "connection ended during STOMP handshake".into(),
        source: None,
    })
}

/// Host portion of the broker URL, for the STOMP `host` header.
fn host_of(url: &str) -> String {
    url.trim_start_matches("ws://")
        .trim_start_matches("wss://")
        .split('/')
        .next()
        .unwrap_or("localhost")
        .split(':')
        .next()
        .unwrap_or("localhost")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticToken(Option<&'static str>);

    impl CredentialProvider for StaticToken {
        fn token(&self) -> Option<String> {
            self.0.map(|t| t.to_string())
        }
    }

    fn connection(token: Option<&'static str>) -> BrokerConnection {
        BrokerConnection::new(BrokerConfig::default(), Arc::new(StaticToken(token)))
    }

    #[test]
    fn host_of_extracts_host() {
        assert_eq!(host_of("ws://localhost:8080/ws"), "localhost");
        assert_eq!(host_of("wss://support.example.com/ws"), "support.example.com");
        assert_eq!(host_of("wss://support.example.com:443"), "support.example.com");
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let conn = connection(Some("jwt"));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn publish_requires_connected() {
        let conn = connection(Some("jwt"));
        let err = conn.publish(ConversationId(1), "hi").await.unwrap_err();
        assert!(matches!(err, WicketError::ConnectionUnavailable { .. }));
    }

    #[tokio::test]
    async fn subscribe_requires_connected() {
        let conn = connection(Some("jwt"));
        let err = conn.subscribe(ConversationId(1)).await.unwrap_err();
        assert!(matches!(err, WicketError::ConnectionUnavailable { .. }));
        assert_eq!(conn.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn connect_without_credential_stays_disconnected() {
        let conn = connection(None);
        conn.connect().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        // No supervisor was started, so disconnect is a plain no-op.
        conn.disconnect().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let conn = connection(Some("jwt"));
        conn.disconnect().await;
        conn.disconnect().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn unsubscribe_without_subscription_is_noop() {
        let conn = connection(Some("jwt"));
        conn.unsubscribe(ConversationId(9)).await;
        assert_eq!(conn.active_subscriptions(), 0);
    }

    #[test]
    fn set_state_suppresses_duplicate_notifications() {
        let (tx, mut rx) = watch::channel(ConnectionState::Disconnected);
        assert!(!rx.has_changed().unwrap());

        set_state(&tx, ConnectionState::Disconnected);
        assert!(!rx.has_changed().unwrap());

        set_state(&tx, ConnectionState::Connecting);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        set_state(&tx, ConnectionState::Connecting);
        assert!(!rx.has_changed().unwrap());
    }
}
