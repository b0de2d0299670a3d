//! Channel trait and the normalized message types every transport speaks.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::choice::Choice;
use crate::error::ChannelError;
use crate::generation::MAX_CHUNK_CHARS;
use crate::generation::split_chunks;
use crate::profile::UserId;
use crate::subscription::Invoice;

/// What the user sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// Typed text (including commands).
    Text,
    /// A keyboard button press; `content` holds the token.
    Selection,
    /// A settled payment reported by the transport.
    Payment { plan_token: String, currency: String },
}

/// A normalized inbound event.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Channel the message arrived on.
    pub channel: String,
    pub user_id: UserId,
    /// Display name, if the transport knows one.
    pub user_name: Option<String>,
    pub kind: MessageKind,
    pub content: String,
    /// Transport routing data (e.g. Telegram `chat_id`).
    pub metadata: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    /// A plain text message.
    pub fn new(channel: impl Into<String>, user_id: UserId, content: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user_id,
            user_name: None,
            kind: MessageKind::Text,
            content: content.into(),
            metadata: serde_json::Value::Null,
            received_at: Utc::now(),
        }
    }

    /// A keyboard selection carrying `token`.
    pub fn selection(channel: impl Into<String>, user_id: UserId, token: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Selection,
            ..Self::new(channel, user_id, token)
        }
    }

    /// A settled payment for the plan named by `plan_token`.
    pub fn payment(
        channel: impl Into<String>,
        user_id: UserId,
        plan_token: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        let plan_token = plan_token.into();
        Self {
            kind: MessageKind::Payment {
                plan_token: plan_token.clone(),
                currency: currency.into(),
            },
            ..Self::new(channel, user_id, plan_token)
        }
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A keyboard button: what the user sees and the token sent back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub token: String,
}

impl Button {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Rows of selection buttons attached to a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// One button per row.
    pub fn column(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// One row per option of `C`, labelled with [`Choice::label`].
    pub fn for_choice<C: Choice>() -> Self {
        Self::column(C::ALL.iter().map(|c| Button::new(c.label(), c.token())))
    }

    pub fn push_row(mut self, row: Vec<Button>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.token.as_str())
    }
}

/// A reply to one inbound event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingResponse {
    /// Ordered message bodies, each at most [`MAX_CHUNK_CHARS`] characters.
    pub chunks: Vec<String>,
    /// Attached to the last chunk.
    pub keyboard: Option<Keyboard>,
    pub invoice: Option<Invoice>,
}

impl OutgoingResponse {
    pub fn text(content: impl AsRef<str>) -> Self {
        Self {
            chunks: split_chunks(content.as_ref(), MAX_CHUNK_CHARS),
            ..Default::default()
        }
    }

    /// Pre-chunked bodies, e.g. a generated plan.
    pub fn chunks(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            ..Default::default()
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn with_invoice(mut self, invoice: Invoice) -> Self {
        self.invoice = Some(invoice);
        self
    }

    /// All chunks joined, for logs and tests.
    pub fn content(&self) -> String {
        self.chunks.concat()
    }
}

/// Progress indicators that are not replies.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Work is in progress (Telegram shows "typing").
    Thinking(String),
    /// A short informational message.
    Status(String),
}

pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A transport the bot reads events from and replies on.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving. The stream ends when the transport closes.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn send_status(
        &self,
        status: StatusUpdate,
        metadata: &serde_json::Value,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
