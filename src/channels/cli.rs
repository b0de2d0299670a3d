//! CLI channel: stdin/stdout REPL for local testing.
//!
//! Plain lines are text. `@<token>` presses a keyboard button and
//! `!paid <plan> <currency>` simulates a settled payment.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
use crate::choice::Choice;
use crate::error::ChannelError;
use crate::profile::UserId;
use crate::subscription::SubscriptionPlan;

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel {
    user_id: UserId,
}

impl CliChannel {
    pub fn new() -> Self {
        Self { user_id: 0 }
    }

    /// Act as `user_id` instead of the default local user.
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn one input line into an event. `None` for blank or malformed lines.
fn parse_line(user_id: UserId, line: &str) -> Option<IncomingMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(token) = line.strip_prefix('@') {
        return Some(IncomingMessage::selection("cli", user_id, token.trim()));
    }

    if let Some(rest) = line.strip_prefix("!paid") {
        let mut parts = rest.split_whitespace();
        let plan = parts.next()?;
        let currency = parts.next().unwrap_or("RUB");
        let token = SubscriptionPlan::from_key(plan)
            .map(|p| p.token())
            .unwrap_or_else(|| plan.to_string());
        return Some(IncomingMessage::payment("cli", user_id, token, currency));
    }

    Some(IncomingMessage::new("cli", user_id, line))
}

/// Render a response for the terminal, listing button tokens.
fn render(response: &OutgoingResponse) -> String {
    let mut out = response.chunks.join("\n");
    if let Some(keyboard) = &response.keyboard {
        for button in keyboard.rows.iter().flatten() {
            out.push_str(&format!("\n  [{}]  @{}", button.label, button.token));
        }
    }
    if let Some(invoice) = &response.invoice {
        out.push_str(&format!(
            "\n  Invoice: {} ({} {} minor units). Simulate with: !paid {} {}",
            invoice.title,
            invoice.amount,
            invoice.currency,
            invoice
                .payload
                .strip_prefix("subscribe:")
                .unwrap_or(&invoice.payload),
            invoice.currency
        ));
    }
    out
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let user_id = self.user_id;

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            // Print prompt
            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(msg) = parse_line(user_id, &line) else {
                            eprint!("> ");
                            continue;
                        };
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}\n", render(&response));
        eprint!("> ");
        Ok(())
    }

    async fn send_status(
        &self,
        status: StatusUpdate,
        _metadata: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        match status {
            StatusUpdate::Thinking(msg) => eprintln!("⏳ {}", msg),
            StatusUpdate::Status(msg) => eprintln!("ℹ️  {}", msg),
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{Keyboard, MessageKind};
    use crate::profile::Goal;
    use crate::subscription::{Currency, invoice_for};

    #[test]
    fn plain_line_is_text() {
        let msg = parse_line(0, "  30 ").unwrap();
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.content, "30");
        assert!(parse_line(0, "   ").is_none());
    }

    #[test]
    fn at_prefix_is_selection() {
        let msg = parse_line(5, "@goal:maintain").unwrap();
        assert_eq!(msg.kind, MessageKind::Selection);
        assert_eq!(msg.content, "goal:maintain");
        assert_eq!(msg.user_id, 5);
    }

    #[test]
    fn paid_simulates_payment() {
        let msg = parse_line(0, "!paid quarter UAH").unwrap();
        assert_eq!(
            msg.kind,
            MessageKind::Payment {
                plan_token: "subscribe:quarter".into(),
                currency: "UAH".into()
            }
        );
        assert!(parse_line(0, "!paid").is_none());
    }

    #[test]
    fn render_lists_buttons_and_invoice() {
        let response = OutgoingResponse::text("Goal?")
            .with_keyboard(Keyboard::for_choice::<Goal>())
            .with_invoice(invoice_for(SubscriptionPlan::Month, Currency::Rub));
        let text = render(&response);
        assert!(text.contains("@goal:maintain"));
        assert!(text.contains("!paid month RUB"));
    }
}
