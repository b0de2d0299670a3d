//! Invoices and payment settlement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::choice::Choice;
use crate::error::DatabaseError;
use crate::profile::UserId;
use crate::store::Database;

use super::model::Subscription;
use super::plan::{Currency, SubscriptionPlan};

/// A payment request rendered by the channel (Telegram `sendInvoice`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub title: String,
    pub description: String,
    /// Echoed back by the provider on settlement, `subscribe:<plan>`.
    pub payload: String,
    pub currency: String,
    /// Amount in the currency's minor unit.
    pub amount: i64,
    pub price_label: String,
}

pub fn invoice_for(plan: SubscriptionPlan, currency: Currency) -> Invoice {
    Invoice {
        title: format!("Subscription: {}", plan.label()),
        description: format!(
            "Weekly meal plans for {} ({} days)",
            plan.label(),
            plan.duration().num_days()
        ),
        payload: plan.token(),
        currency: currency.code().to_string(),
        amount: plan.price_minor_units(currency),
        price_label: plan.label().to_string(),
    }
}

/// Record a settled payment. Replaces any previous subscription; durations
/// do not stack.
pub async fn confirm_subscription(
    store: &dyn Database,
    user_id: UserId,
    plan: SubscriptionPlan,
    currency: &str,
    now: DateTime<Utc>,
) -> Result<Subscription, DatabaseError> {
    let subscription = Subscription::activate(user_id, plan, currency, now);
    store.put_subscription(&subscription).await?;
    info!(
        user_id,
        plan = plan.key(),
        currency,
        expires_at = %subscription.expires_at,
        "Subscription activated"
    );
    Ok(subscription)
}
