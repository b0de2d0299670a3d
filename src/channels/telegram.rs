//! Telegram channel: long-polls the Bot API for updates.
//!
//! Text messages become `Text` events, inline keyboard presses become
//! `Selection` events and `successful_payment` becomes a `Payment` event.
//! Pre-checkout queries are answered here without reaching the bot.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::channels::{
    Channel, IncomingMessage, Keyboard, MessageStream, OutgoingResponse, StatusUpdate,
};
use crate::choice::Choice;
use crate::config::TelegramConfig;
use crate::error::ChannelError;
use crate::subscription::{Invoice, SubscriptionPlan};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const PAYMENTS_UNAVAILABLE: &str =
    "💳 Payments are currently unavailable. Please try again later.";

/// Telegram channel: connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: String,
    allowed_users: Vec<String>,
    payment_token: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            payment_token: None,
            api_base: TELEGRAM_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &TelegramConfig) -> Self {
        Self::new(config.bot_token.clone(), config.allowed_users.clone())
            .with_payment_token(config.payment_token.clone())
    }

    /// Provider token for `sendInvoice`. Without one, invoices are answered
    /// with a "payments unavailable" message.
    pub fn with_payment_token(mut self, token: Option<String>) -> Self {
        self.payment_token = token;
        self
    }

    /// Point the channel at a different Bot API server.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.api_base, &self.bot_token, method)
    }

    /// Check if a username is in the allowed list.
    pub fn is_user_allowed(&self, username: &str) -> bool {
        self.allowed_users.iter().any(|u| u == "*" || u == username)
    }

    /// Check if any of the provided identities is allowed.
    pub fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        identities.into_iter().any(|id| self.is_user_allowed(id))
    }

    async fn call(&self, method: &str, body: &Value) -> Result<reqwest::Response, ChannelError> {
        self.client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })
    }

    /// Send one chunk, trying Markdown first with plain text fallback.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let mut markdown_body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });
        if let Some(keyboard) = keyboard {
            markdown_body["reply_markup"] = inline_keyboard(keyboard);
        }

        let markdown_resp = self.call("sendMessage", &markdown_body).await?;
        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        tracing::warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let mut plain_body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(keyboard) = keyboard {
            plain_body["reply_markup"] = inline_keyboard(keyboard);
        }
        let plain_resp = self.call("sendMessage", &plain_body).await?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (markdown: {}, plain: {})",
                    markdown_status, plain_err
                ),
            });
        }

        Ok(())
    }

    async fn send_invoice(&self, chat_id: &str, invoice: &Invoice) -> Result<(), ChannelError> {
        let Some(provider_token) = self.payment_token.as_deref() else {
            tracing::warn!(chat_id, payload = %invoice.payload, "Invoice requested but no payment token is configured");
            return self.send_message_chunk(chat_id, PAYMENTS_UNAVAILABLE, None).await;
        };

        let resp = self
            .call("sendInvoice", &invoice_body(chat_id, invoice, provider_token))
            .await?;
        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendInvoice failed: {err}"),
            });
        }

        tracing::info!(chat_id, payload = %invoice.payload, "Telegram invoice sent");
        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let api_base = self.api_base.clone();
        let bot_token = self.bot_token.clone();
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query", "pre_checkout_query"]
                });

                let resp = match client
                    .post(api_url(&api_base, &bot_token, "getUpdates"))
                    .json(&body)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    match parse_update(update, &allowed_users) {
                        ParsedUpdate::Incoming {
                            message,
                            callback_id,
                        } => {
                            if let Some(id) = callback_id {
                                let _ = client
                                    .post(api_url(&api_base, &bot_token, "answerCallbackQuery"))
                                    .json(&json!({ "callback_query_id": id }))
                                    .send()
                                    .await;
                            }
                            if tx.send(message).is_err() {
                                tracing::info!("Telegram listener channel closed");
                                return;
                            }
                        }
                        ParsedUpdate::PreCheckout { query_id, ok } => {
                            let mut answer = json!({ "pre_checkout_query_id": query_id, "ok": ok });
                            if !ok {
                                answer["error_message"] =
                                    json!("This subscription plan is no longer available.");
                            }
                            if let Err(e) = client
                                .post(api_url(&api_base, &bot_token, "answerPreCheckoutQuery"))
                                .json(&answer)
                                .send()
                                .await
                            {
                                tracing::error!("Failed to answer pre-checkout query: {e}");
                            }
                        }
                        ParsedUpdate::Skip => {}
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        let last = response.chunks.len().saturating_sub(1);
        for (i, chunk) in response.chunks.iter().enumerate() {
            let keyboard = if i == last {
                response.keyboard.as_ref()
            } else {
                None
            };
            self.send_message_chunk(chat_id, chunk, keyboard).await?;
        }

        if let Some(invoice) = &response.invoice {
            self.send_invoice(chat_id, invoice).await?;
        }
        Ok(())
    }

    async fn send_status(
        &self,
        status: StatusUpdate,
        metadata: &Value,
    ) -> Result<(), ChannelError> {
        if let Some(chat_id) = metadata.get("chat_id").and_then(|v| v.as_str()) {
            match status {
                StatusUpdate::Thinking(_) => {
                    let _ = self
                        .call("sendChatAction", &json!({ "chat_id": chat_id, "action": "typing" }))
                        .await;
                }
                StatusUpdate::Status(ref msg) if !msg.is_empty() => {
                    let _ = self
                        .send_message_chunk(chat_id, &format!("ℹ️ {msg}"), None)
                        .await;
                }
                StatusUpdate::Status(_) => {}
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(base: &str, bot_token: &str, method: &str) -> String {
    format!("{base}/bot{bot_token}/{method}")
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

fn inline_keyboard(keyboard: &Keyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.token }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

fn invoice_body(chat_id: &str, invoice: &Invoice, provider_token: &str) -> Value {
    json!({
        "chat_id": chat_id,
        "title": invoice.title,
        "description": invoice.description,
        "payload": invoice.payload,
        "provider_token": provider_token,
        "currency": invoice.currency,
        "prices": [{ "label": invoice.price_label, "amount": invoice.amount }],
    })
}

/// One `getUpdates` result, classified.
#[derive(Debug)]
enum ParsedUpdate {
    Incoming {
        message: IncomingMessage,
        /// Set for inline keyboard presses, which must be acknowledged.
        callback_id: Option<String>,
    },
    PreCheckout {
        query_id: String,
        ok: bool,
    },
    Skip,
}

/// Sender identity and routing data shared by every update kind.
fn sender(from: Option<&Value>, chat: Option<&Value>, allowed_users: &[String]) -> Option<(i64, Value, String)> {
    let from = from?;
    let username = from
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let user_id = from.get("id").and_then(Value::as_i64)?;
    let user_id_str = user_id.to_string();

    if !check_user_allowed(allowed_users, [username, user_id_str.as_str()]) {
        tracing::warn!(
            "Telegram: ignoring update from unauthorized user: \
             username={username}, user_id={user_id_str}"
        );
        return None;
    }

    let chat_id = chat
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_else(|| user_id_str.clone());

    let display = from
        .get("first_name")
        .and_then(Value::as_str)
        .unwrap_or(username)
        .to_string();

    Some((
        user_id,
        json!({ "chat_id": chat_id, "username": username }),
        display,
    ))
}

fn parse_update(update: &Value, allowed_users: &[String]) -> ParsedUpdate {
    if let Some(message) = update.get("message") {
        let Some((user_id, metadata, display)) =
            sender(message.get("from"), message.get("chat"), allowed_users)
        else {
            return ParsedUpdate::Skip;
        };

        if let Some(payment) = message.get("successful_payment") {
            let payload = payment
                .get("invoice_payload")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let currency = payment
                .get("currency")
                .and_then(Value::as_str)
                .unwrap_or_default();
            tracing::info!(user_id, payload, currency, "Telegram payment settled");
            return ParsedUpdate::Incoming {
                message: IncomingMessage::payment("telegram", user_id, payload, currency)
                    .with_metadata(metadata)
                    .with_user_name(display),
                callback_id: None,
            };
        }

        let Some(text) = message.get("text").and_then(Value::as_str) else {
            return ParsedUpdate::Skip;
        };
        return ParsedUpdate::Incoming {
            message: IncomingMessage::new("telegram", user_id, text)
                .with_metadata(metadata)
                .with_user_name(display),
            callback_id: None,
        };
    }

    if let Some(callback) = update.get("callback_query") {
        let chat = callback.get("message").and_then(|m| m.get("chat"));
        let Some((user_id, metadata, display)) =
            sender(callback.get("from"), chat, allowed_users)
        else {
            return ParsedUpdate::Skip;
        };
        let Some(data) = callback.get("data").and_then(Value::as_str) else {
            return ParsedUpdate::Skip;
        };
        return ParsedUpdate::Incoming {
            message: IncomingMessage::selection("telegram", user_id, data)
                .with_metadata(metadata)
                .with_user_name(display),
            callback_id: callback
                .get("id")
                .and_then(Value::as_str)
                .map(String::from),
        };
    }

    if let Some(query) = update.get("pre_checkout_query") {
        let Some(query_id) = query.get("id").and_then(Value::as_str) else {
            return ParsedUpdate::Skip;
        };
        let payload = query
            .get("invoice_payload")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return ParsedUpdate::PreCheckout {
            query_id: query_id.to_string(),
            ok: SubscriptionPlan::from_token(payload).is_ok(),
        };
    }

    ParsedUpdate::Skip
}

// ── Tests ───────────────────────────────────────────────────────────
