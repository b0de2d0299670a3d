//! Subscriptions: plans and prices, the stored record, entitlement checks
//! and payment settlement.

pub mod entitlement;
pub mod model;
pub mod payment;
pub mod plan;

pub use entitlement::Entitlements;
pub use model::Subscription;
pub use payment::{Invoice, confirm_subscription, invoice_for};
pub use plan::{Currency, SubscriptionPlan};
