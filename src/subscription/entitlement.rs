//! Entitlement checks over stored records.
//!
//! Absence of a record is never an error here: a user without a
//! subscription is simply not subscribed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{CommandError, DatabaseError, PreconditionError};
use crate::generation::PlanScope;
use crate::profile::{UserId, UserProfile};
use crate::store::Database;

#[derive(Clone)]
pub struct Entitlements {
    store: Arc<dyn Database>,
}

impl Entitlements {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self { store }
    }

    pub async fn is_subscribed(&self, user_id: UserId) -> Result<bool, DatabaseError> {
        self.is_subscribed_at(user_id, Utc::now()).await
    }

    pub async fn is_subscribed_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        Ok(self
            .store
            .get_subscription(user_id)
            .await?
            .is_some_and(|sub| sub.is_active_at(now)))
    }

    pub async fn can_access_weekly_plan(&self, user_id: UserId) -> Result<bool, DatabaseError> {
        self.is_subscribed(user_id).await
    }

    /// Check every precondition for a plan of `scope` and hand back the
    /// profile the plan will be built from.
    pub async fn require(
        &self,
        user_id: UserId,
        scope: PlanScope,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, CommandError> {
        let Some(profile) = self.store.get_profile(user_id).await? else {
            debug!(user_id, %scope, "Refused: no profile");
            return Err(PreconditionError::MissingProfile.into());
        };

        if scope.requires_subscription() && !self.is_subscribed_at(user_id, now).await? {
            debug!(user_id, %scope, "Refused: not subscribed");
            return Err(PreconditionError::NotSubscribed.into());
        }

        Ok(profile)
    }
}
