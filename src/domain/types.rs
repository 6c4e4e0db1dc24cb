//! # Domain Types
//!
//! Transport-neutral chat types: inbound events, keyboards, outgoing media,
//! and the per-chat conversation session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telegram-style message identifier.
pub type MessageId = i32;

/// An event received from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `/name args`
    Command { name: String, args: String },
    /// A button press carrying the button's payload.
    Callback {
        id: String,
        data: String,
        message_id: Option<MessageId>,
    },
    /// Free text that is not a command.
    Text(String),
}

impl Inbound {
    /// Classifies a raw text message. `/start@my_bot 123` becomes
    /// `Command { name: "start", args: "123" }`.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if let Some(rest) = trimmed.strip_prefix('/') {
            let (head, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let name = head.split('@').next().unwrap_or(head);
            if !name.is_empty() {
                return Self::Command {
                    name: name.to_lowercase(),
                    args: args.trim().to_string(),
                };
            }
        }
        Self::Text(text.to_string())
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Callback { .. } => "callback",
            Self::Text(_) => "text",
        }
    }
}

/// An inline button with the payload sent back when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Rows of inline buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row holding a single button.
    pub fn button(mut self, label: impl Into<String>, payload: impl Into<String>) -> Self {
        self.rows.push(vec![Button::new(label, payload)]);
        self
    }

    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.payload.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

/// An image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// Position of a chat in the purchase flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    HandleMenu,
    HandleDescription,
    HandleCart,
    WaitingEmail,
}

/// Persisted per-chat conversation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// `None` until the chat sends `/start`.
    #[serde(default)]
    pub status: Option<Status>,
    /// Last email accepted at checkout.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    pub fn advance(&mut self, status: Status) {
        self.status = Some(status);
        self.updated_at = Some(Utc::now());
    }
}
