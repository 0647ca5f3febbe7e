// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal STOMP 1.2 frame codec.
//!
//! Frames travel as WebSocket text messages: a command line, header lines,
//! a blank line, then the body terminated by a NUL octet. Only the commands
//! the support broker actually exchanges are modeled. Bodies are JSON, so
//! `content-length` is not emitted and NULs never appear inside a body.

use wicket_core::error::WicketError;
use wicket_core::types::ConversationId;

/// STOMP commands used by the chat broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Send,
    Message,
    Error,
    Disconnect,
    Receipt,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Send => "SEND",
            Command::Message => "MESSAGE",
            Command::Error => "ERROR",
            Command::Disconnect => "DISCONNECT",
            Command::Receipt => "RECEIPT",
        }
    }

    fn parse(s: &str) -> Option<Command> {
        match s {
            "CONNECT" => Some(Command::Connect),
            "CONNECTED" => Some(Command::Connected),
            "SUBSCRIBE" => Some(Command::Subscribe),
            "UNSUBSCRIBE" => Some(Command::Unsubscribe),
            "SEND" => Some(Command::Send),
            "MESSAGE" => Some(Command::Message),
            "ERROR" => Some(Command::Error),
            "DISCONNECT" => Some(Command::Disconnect),
            "RECEIPT" => Some(Command::Receipt),
            _ => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Appends a header (builder style). Repeated headers keep the first
    /// occurrence authoritative on read, per STOMP 1.2.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value for a header name, if present.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Encodes the frame to its NUL-terminated wire form.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::new();
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decodes a frame from its wire form.
    ///
    /// Tolerates `\r\n` line endings and a missing trailing NUL (some
    /// brokers omit it inside WebSocket text frames).
    pub fn decode(text: &str) -> Result<Frame, WicketError> {
        let text = text.strip_suffix('\0').unwrap_or(text);

        let mut lines = text.split('\n');
        let raw_command_line = lines.next().unwrap_or_default();
        let command_line = raw_command_line.trim_end_matches('\r');
        let command = Command::parse(command_line).ok_or_else(|| WicketError::Decode {
            message: format!("unknown STOMP command `{command_line}`"),
            source: None,
        })?;

        let escape = command.escapes_headers();
        let mut headers = Vec::new();
        // Byte offset of the body: raw line lengths plus the '\n' separators.
        let mut header_len = raw_command_line.len() + 1;
        for raw_line in lines {
            let line = raw_line.trim_end_matches('\r');
            header_len += raw_line.len() + 1;
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(':').ok_or_else(|| WicketError::Decode {
                message: format!("malformed STOMP header line `{line}`"),
                source: None,
            })?;
            if escape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let body = if header_len >= text.len() {
            String::new()
        } else {
            text[header_len..].to_string()
        };

        Ok(Frame {
            command,
            headers,
            body,
        })
    }
}

impl Command {
    /// CONNECT and CONNECTED headers are exchanged verbatim; every other
    /// frame escapes header octets per STOMP 1.2.
    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, WicketError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(WicketError::Decode {
                    message: format!("invalid header escape `\\{}`", other.unwrap_or(' ')),
                    source: None,
                });
            }
        }
    }
    Ok(out)
}

/// Inbound subscription destination for a conversation.
pub fn topic_destination(id: ConversationId) -> String {
    format!("/topic/conversation/{id}")
}

/// Outbound send destination for a conversation.
pub fn send_destination(id: ConversationId) -> String {
    format!("/app/chat/{id}")
}

/// Extracts the conversation id from a topic destination, if it is one.
pub fn conversation_from_topic(destination: &str) -> Option<ConversationId> {
    destination
        .strip_prefix("/topic/conversation/")
        .and_then(|raw| raw.parse::<i64>().ok())
        .map(ConversationId)
}

/// CONNECT frame carrying the bearer credential as a connection header.
/// The credential is attached here once, never per message.
pub fn connect_frame(token: &str, host: &str) -> Frame {
    Frame::new(Command::Connect)
        .header("accept-version", "1.2")
        .header("host", host)
        .header("heart-beat", "0,0")
        .header("Authorization", format!("Bearer {token}"))
}

pub fn subscribe_frame(sub_id: &str, destination: &str) -> Frame {
    Frame::new(Command::Subscribe)
        .header("id", sub_id)
        .header("destination", destination)
        .header("ack", "auto")
}

pub fn unsubscribe_frame(sub_id: &str) -> Frame {
    Frame::new(Command::Unsubscribe).header("id", sub_id)
}

pub fn send_frame(destination: &str, body: String) -> Frame {
    Frame::new(Command::Send)
        .header("destination", destination)
        .header("content-type", "application/json")
        .body(body)
}

pub fn disconnect_frame() -> Frame {
    Frame::new(Command::Disconnect)
}
