//! `Database` trait: single async interface for all persistence.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::generation::{GenerationRecord, MealRecord, NewGeneration, NewMeal};
use crate::profile::{UserId, UserProfile};
use crate::subscription::Subscription;

/// Backend-agnostic database trait.
///
/// Each write is a single statement, or a single transaction when a plan is
/// recorded together with its meals, so a record is either fully visible or
/// not at all.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Profiles ────────────────────────────────────────────────────

    /// Insert or wholesale-replace the user's profile.
    async fn put_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError>;

    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, DatabaseError>;

    // ── Subscriptions ───────────────────────────────────────────────

    /// Insert or replace the user's subscription.
    async fn put_subscription(&self, subscription: &Subscription) -> Result<(), DatabaseError>;

    async fn get_subscription(
        &self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, DatabaseError>;

    // ── Generation history ──────────────────────────────────────────

    /// Append a generation record, returning its id.
    async fn append_generation(&self, generation: &NewGeneration) -> Result<i64, DatabaseError>;

    /// A user's generations, newest first.
    async fn list_generations(
        &self,
        user_id: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<GenerationRecord>, DatabaseError>;

    // ── Meals ───────────────────────────────────────────────────────

    /// Record a delivered plan and its meals in one transaction.
    ///
    /// Returns the generation id and the meal ids in order. On error nothing
    /// is written.
    async fn record_generation(
        &self,
        generation: &NewGeneration,
        meals: &[NewMeal],
    ) -> Result<(i64, Vec<i64>), DatabaseError>;

    /// A user's most recent meals, newest first.
    async fn recent_meals(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<MealRecord>, DatabaseError>;
}
