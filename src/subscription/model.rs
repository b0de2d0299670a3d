//! Stored subscription record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::UserId;

use super::plan::SubscriptionPlan;

/// At most one per user; a new settlement replaces the previous record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub plan: SubscriptionPlan,
    pub currency: String,
    pub activated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
}

impl Subscription {
    /// A fresh, active subscription starting at `activated_at`.
    pub fn activate(
        user_id: UserId,
        plan: SubscriptionPlan,
        currency: impl Into<String>,
        activated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            plan,
            currency: currency.into(),
            activated_at,
            expires_at: activated_at + plan.duration(),
            active: true,
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.active && now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn activate_sets_expiry_from_plan() {
        let sub = Subscription::activate(1, SubscriptionPlan::Quarter, "UAH", t0());
        assert_eq!(sub.expires_at, t0() + Duration::days(90));
        assert!(sub.active);
    }

    #[test]
    fn expiry_is_exclusive() {
        let sub = Subscription::activate(1, SubscriptionPlan::Month, "RUB", t0());
        assert!(sub.is_active_at(t0()));
        assert!(sub.is_active_at(sub.expires_at - Duration::seconds(1)));
        assert!(!sub.is_active_at(sub.expires_at));
    }

    #[test]
    fn inactive_flag_wins() {
        let mut sub = Subscription::activate(1, SubscriptionPlan::Year, "RUB", t0());
        sub.active = false;
        assert!(!sub.is_active_at(t0() + Duration::days(1)));
    }
}
