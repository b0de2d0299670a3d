//! Bot: routes normalized channel events to commands, the dialogue
//! manager, payments and the generation orchestrator.

pub mod bot_loop;
pub mod command;
pub mod replies;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::analytics;
use crate::channels::{IncomingMessage, MessageKind, OutgoingResponse};
use crate::choice::Choice;
use crate::config::BotConfig;
use crate::dialogue::{DialogueInput, DialogueManager, Transition};
use crate::error::{CommandError, PreconditionError};
use crate::generation::{GenerationOrder, MealPlanGenerator, Orchestrator};
use crate::profile::UserId;
use crate::store::Database;
use crate::subscription::{Currency, SubscriptionPlan, confirm_subscription, invoice_for};

pub use bot_loop::run;
pub use command::Command;

/// What one inbound event produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Handled {
    /// Replies to send now, in order.
    pub responses: Vec<OutgoingResponse>,
    /// A committed generation dialogue, to run after the replies are sent.
    pub order: Option<GenerationOrder>,
}

impl Handled {
    fn reply(response: OutgoingResponse) -> Self {
        Self {
            responses: vec![response],
            order: None,
        }
    }

    fn generate(order: GenerationOrder) -> Self {
        Self {
            responses: Vec::new(),
            order: Some(order),
        }
    }
}

pub struct Bot {
    store: Arc<dyn Database>,
    dialogue: DialogueManager,
    orchestrator: Orchestrator,
    currency: Currency,
}

impl Bot {
    pub fn new(
        store: Arc<dyn Database>,
        generator: Arc<dyn MealPlanGenerator>,
        config: &BotConfig,
    ) -> Self {
        Self {
            dialogue: DialogueManager::new(store.clone()),
            orchestrator: Orchestrator::new(store.clone(), generator, config.generation_timeout),
            store,
            currency: config.currency,
        }
    }

    pub fn dialogue(&self) -> &DialogueManager {
        &self.dialogue
    }

    /// Handle one event and run any generation it ordered.
    pub async fn process(&self, msg: &IncomingMessage) -> Vec<OutgoingResponse> {
        let handled = self.handle_message(msg).await;
        let mut responses = handled.responses;
        if let Some(order) = handled.order {
            responses.push(self.generate(&order, msg.received_at).await);
        }
        responses
    }

    /// Handle one event. Time is taken from `msg.received_at`.
    ///
    /// Never holds a dialogue lock on return; a generation order is handed
    /// back rather than run here.
    pub async fn handle_message(&self, msg: &IncomingMessage) -> Handled {
        let user_id = msg.user_id;
        let now = msg.received_at;

        match &msg.kind {
            MessageKind::Payment {
                plan_token,
                currency,
            } => Handled::reply(self.settle_payment(user_id, plan_token, currency, now).await),
            MessageKind::Selection => {
                let token = msg.content.trim();
                if token.split(':').next() == Some(SubscriptionPlan::FIELD) {
                    return Handled::reply(self.plan_selected(user_id, token));
                }
                self.dialogue_input(user_id, DialogueInput::Selection(token), now, true)
                    .await
            }
            MessageKind::Text => match Command::parse(&msg.content) {
                Some(command) => self.command(msg, command, now).await,
                None => {
                    self.dialogue_input(user_id, DialogueInput::Text(msg.content.trim()), now, false)
                        .await
                }
            },
        }
    }

    /// Run a generation order and render the result.
    pub async fn generate(&self, order: &GenerationOrder, now: DateTime<Utc>) -> OutgoingResponse {
        match self.orchestrator.run_at(order, now).await {
            Ok(outcome) => OutgoingResponse::chunks(outcome.into_chunks()),
            Err(e) => failure(order.user_id, &e),
        }
    }

    async fn command(&self, msg: &IncomingMessage, command: Command, now: DateTime<Utc>) -> Handled {
        let user_id = msg.user_id;
        debug!(user_id, command = ?command, "Command received");

        let response = match command {
            Command::Start => replies::welcome(msg.user_name.as_deref()),
            Command::Help => replies::help(self.currency),
            Command::Profile => self
                .dialogue
                .start_profile(user_id, now)
                .await
                .unwrap_or_else(|e| failure(user_id, &e)),
            Command::Generate(scope) => self
                .dialogue
                .start_generation(user_id, scope, now)
                .await
                .unwrap_or_else(|e| failure(user_id, &e)),
            Command::Subscribe => self
                .subscribe_menu(user_id, now)
                .await
                .unwrap_or_else(|e| failure(user_id, &e)),
            Command::Analytics => self
                .analytics(user_id, now)
                .await
                .unwrap_or_else(|e| failure(user_id, &e)),
            Command::DetailedAnalytics => self
                .detailed_analytics(user_id)
                .await
                .unwrap_or_else(|e| failure(user_id, &e)),
            Command::Cancel => replies::cancelled(self.dialogue.cancel(user_id).await),
            Command::Unknown(name) => replies::unknown_command(&name),
        };
        Handled::reply(response)
    }

    async fn dialogue_input(
        &self,
        user_id: UserId,
        input: DialogueInput<'_>,
        now: DateTime<Utc>,
        is_selection: bool,
    ) -> Handled {
        let transition = match self.dialogue.handle_input(user_id, input, now).await {
            Ok(transition) => transition,
            Err(e) => return Handled::reply(failure(user_id, &e)),
        };

        match transition {
            Transition::NoSession if is_selection => {
                Handled::reply(OutgoingResponse::text(replies::EXPIRED_BUTTON))
            }
            Transition::NoSession => Handled::reply(OutgoingResponse::text(replies::NO_SESSION_HINT)),
            Transition::Reprompt { response, .. }
            | Transition::Advanced { response, .. }
            | Transition::ProfileCommitted { response, .. }
            | Transition::Aborted { response } => Handled::reply(response),
            Transition::GenerationOrdered(order) => Handled::generate(order),
        }
    }

    fn plan_selected(&self, user_id: UserId, token: &str) -> OutgoingResponse {
        match SubscriptionPlan::from_token(token) {
            Ok(plan) => {
                info!(user_id, plan = plan.key(), "Invoice requested");
                OutgoingResponse::text(format!(
                    "💳 {} - {} {}",
                    plan.label(),
                    plan.price(self.currency),
                    self.currency.symbol()
                ))
                .with_invoice(invoice_for(plan, self.currency))
            }
            Err(e) => {
                warn!(user_id, token, error = %e, "Unknown subscription token");
                OutgoingResponse::text(replies::EXPIRED_BUTTON)
            }
        }
    }

    async fn settle_payment(
        &self,
        user_id: UserId,
        plan_token: &str,
        currency: &str,
        now: DateTime<Utc>,
    ) -> OutgoingResponse {
        let plan = match SubscriptionPlan::from_token(plan_token) {
            Ok(plan) => plan,
            Err(e) => {
                error!(user_id, plan_token, currency, error = %e, "Payment for unknown plan");
                return OutgoingResponse::text(
                    "❌ Payment received, but the plan was not recognized. Please contact support.",
                );
            }
        };

        let currency = currency.trim().to_uppercase();
        match confirm_subscription(self.store.as_ref(), user_id, plan, &currency, now).await {
            Ok(subscription) => replies::subscription_confirmed(&subscription),
            Err(e) => {
                error!(user_id, plan = plan.key(), error = %e, "Failed to record payment");
                OutgoingResponse::text(
                    "❌ Payment received, but we could not activate your subscription. \
                     Please contact support.",
                )
            }
        }
    }

    async fn subscribe_menu(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<OutgoingResponse, CommandError> {
        let current = self.store.get_subscription(user_id).await?;
        Ok(replies::subscribe_menu(self.currency, current.as_ref(), now))
    }

    async fn analytics(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<OutgoingResponse, CommandError> {
        let Some(profile) = self.store.get_profile(user_id).await? else {
            return Err(PreconditionError::MissingProfile.into());
        };
        let subscription = self.store.get_subscription(user_id).await?;
        let history = self.store.list_generations(user_id, None).await?;
        let summary = analytics::summarize(&history, now);
        Ok(replies::analytics_summary(
            &profile,
            subscription.as_ref(),
            &summary,
            now,
        ))
    }

    async fn detailed_analytics(&self, user_id: UserId) -> Result<OutgoingResponse, CommandError> {
        let history = self.store.list_generations(user_id, None).await?;
        if history.is_empty() {
            return Ok(OutgoingResponse::text(
                "You have not generated any meal plans yet. Try /generateforday",
            ));
        }
        Ok(replies::detailed_analytics(&analytics::detail(&history)))
    }
}

/// Log a failed command once and turn it into the user-facing reply.
fn failure(user_id: UserId, error: &CommandError) -> OutgoingResponse {
    match error {
        CommandError::Precondition(reason) => debug!(user_id, %reason, "Command refused"),
        CommandError::Generation(e) => error!(user_id, error = %e, "Meal plan generation failed"),
        CommandError::Database(e) => error!(user_id, error = %e, "Storage failure"),
    }
    OutgoingResponse::text(error.user_message())
}
