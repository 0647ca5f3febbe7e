// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wicket shell` command implementation.
//!
//! Launches an interactive chat shell with readline history and colored
//! output. Conversations are opened with slash commands; plain input sends
//! to the open conversation. Inbound pushes print live via the session's
//! change watch, and the connectivity indicator follows the connection
//! state watch.

use std::sync::Arc;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;

use wicket_api::ApiClient;
use wicket_broker::BrokerConnection;
use wicket_config::{ConfigCredentials, ConfigIdentity, WicketConfig};
use wicket_core::error::WicketError;
use wicket_core::traits::{ConversationStore, PushChannel, ViewerIdentity};
use wicket_core::types::{ChatMessage, ConnectionState, Conversation, ConversationId, UserId};
use wicket_session::ConversationSession;

/// Runs the `wicket shell` interactive chat loop.
pub async fn run_shell(config: WicketConfig) -> Result<(), WicketError> {
    let credentials = Arc::new(ConfigCredentials::new(&config.auth));
    let identity = Arc::new(ConfigIdentity::new(&config.client));

    if identity.current_user_id().is_none() {
        warn!("client.user_id not set: echoes of your own messages will not be suppressed");
    }

    let store: Arc<dyn ConversationStore> =
        Arc::new(ApiClient::new(&config.api, credentials.as_ref())?);
    let channel: Arc<dyn PushChannel> = Arc::new(BrokerConnection::new(
        config.broker.clone(),
        credentials.clone(),
    ));

    let session = Arc::new(ConversationSession::new(
        channel,
        store.clone(),
        identity.clone(),
    ));
    session.start().await?;

    // Live printers: inbound messages and connectivity transitions.
    let printer = tokio::spawn(print_new_messages(
        session.clone(),
        identity.current_user_id(),
    ));
    let state_printer = tokio::spawn(print_state_changes(session.state_changes()));

    println!("{}", "wicket shell".bold().green());
    println!(
        "Commands: {} {} {} {} {} {}  -- plain text sends to the open conversation.\n",
        "/list".yellow(),
        "/unassigned".yellow(),
        "/open <id>".yellow(),
        "/new <subject>".yellow(),
        "/close".yellow(),
        "/quit".yellow(),
    );

    let mut rl = DefaultEditor::new()
        .map_err(|e| WicketError::Internal(format!("failed to initialize readline: {e}")))?;

    let prompt = format!("{}> ", "wicket".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                let _ = rl.add_history_entry(&line);

                if let Err(e) = handle_input(&session, store.as_ref(), trimmed).await {
                    if e.is_user_visible() {
                        eprintln!("{} {e}", "message not sent -- retry:".red());
                    } else {
                        eprintln!("{}: {e}", "error".red());
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    session.shutdown().await;
    printer.abort();
    state_printer.abort();
    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Dispatches one line of shell input.
async fn handle_input(
    session: &ConversationSession,
    store: &dyn ConversationStore,
    input: &str,
) -> Result<(), WicketError> {
    if let Some(rest) = input.strip_prefix("/open ") {
        let id = parse_id(rest)?;
        let conversation = store.get_conversation(id).await?;
        session.select(&conversation).await?;
        println!(
            "{}",
            format!("-- {} ({})", conversation.subject, status_label(&conversation)).dimmed()
        );
        return Ok(());
    }

    if let Some(subject) = input.strip_prefix("/new ") {
        let conversation = store.create_conversation(subject.trim()).await?;
        println!(
            "{}",
            format!("opened conversation {}", conversation.id).dimmed()
        );
        session.select(&conversation).await?;
        return Ok(());
    }

    match input {
        "/list" => {
            print_conversations(&store.list_conversations().await?);
            Ok(())
        }
        "/unassigned" => {
            print_conversations(&store.list_unassigned().await?);
            Ok(())
        }
        "/close" => {
            let id = selected_or_err(session)?;
            let closed = store.close_conversation(id).await?;
            println!("{}", format!("conversation {} closed", closed.id).dimmed());
            session.clear_selection().await;
            Ok(())
        }
        "/assign" => {
            let id = selected_or_err(session)?;
            store.assign_conversation(id).await?;
            println!("{}", "conversation assigned to you".dimmed());
            Ok(())
        }
        "/back" => {
            session.clear_selection().await;
            Ok(())
        }
        other if other.starts_with('/') => Err(WicketError::Internal(format!(
            "unknown command `{other}`"
        ))),
        text => {
            session.send(text).await?;
            Ok(())
        }
    }
}

fn selected_or_err(session: &ConversationSession) -> Result<ConversationId, WicketError> {
    session
        .selected()
        .ok_or_else(|| WicketError::Internal("no conversation open (use /open <id>)".into()))
}

fn parse_id(raw: &str) -> Result<ConversationId, WicketError> {
    raw.trim()
        .parse::<i64>()
        .map(ConversationId)
        .map_err(|_| WicketError::Internal(format!("`{}` is not a conversation id", raw.trim())))
}

fn print_conversations(conversations: &[Conversation]) {
    if conversations.is_empty() {
        println!("{}", "no conversations".dimmed());
        return;
    }
    for c in conversations {
        let unread = if c.unread_count > 0 {
            format!(" [{} unread]", c.unread_count).yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "{:>6}  {}  {}{}",
            c.id.to_string().bold(),
            status_label(c),
            c.subject,
            unread
        );
    }
}

fn status_label(conversation: &Conversation) -> colored::ColoredString {
    use wicket_core::types::ConversationStatus;
    match conversation.status {
        ConversationStatus::Open => "open".green(),
        ConversationStatus::Pending => "pending".yellow(),
        ConversationStatus::Closed => "closed".red(),
    }
}

/// Prints message-list additions as they happen.
///
/// Tracks how many rows were already printed; a shrink (conversation
/// switch) resets the counter so the new history prints once.
async fn print_new_messages(session: Arc<ConversationSession>, viewer: Option<UserId>) {
    let mut changes = session.changes();
    let mut printed = 0usize;

    while changes.changed().await.is_ok() {
        let messages = session.messages();
        if messages.len() < printed {
            printed = 0;
        }
        for msg in &messages[printed..] {
            print_message(msg, viewer);
        }
        printed = messages.len();
    }
}

fn print_message(msg: &ChatMessage, viewer: Option<UserId>) {
    let time = msg.sent_at.format("%H:%M");
    let is_mine = viewer == Some(msg.sender_id);
    let name = if is_mine {
        msg.sender_name.green()
    } else {
        msg.sender_name.cyan()
    };
    println!("{} {} {}", format!("[{time}]").dimmed(), name.bold(), msg.content);
}

/// Prints connectivity transitions as a dimmed indicator line.
async fn print_state_changes(
    mut states: tokio::sync::watch::Receiver<ConnectionState>,
) {
    while states.changed().await.is_ok() {
        let state = *states.borrow_and_update();
        let line = match state {
            ConnectionState::Connected => "-- live updates connected".green().dimmed(),
            ConnectionState::Connecting => "-- connecting...".yellow().dimmed(),
            ConnectionState::Disconnected => {
                "-- live updates unavailable, sends fall back to the API"
                    .yellow()
                    .dimmed()
            }
        };
        println!("{line}");
    }
}
