//! Generation orchestrator: turns a committed generation dialogue into a
//! delivered, recorded meal plan.
//!
//! Runs outside any dialogue lock. The provider call is the only slow step
//! and is bounded by a timeout.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::choice::Choice;
use crate::error::{CommandError, GenerationError};
use crate::profile::UserId;
use crate::store::Database;
use crate::subscription::Entitlements;

use super::breakdown;
use super::chunking::{MAX_CHUNK_CHARS, split_chunks};
use super::model::{MealType, NewGeneration, NewMeal, PlanScope};
use super::provider::{MealPlanGenerator, is_error_output};
use super::request::GenerationRequest;

/// Everything the generation dialogue collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOrder {
    pub user_id: UserId,
    pub scope: PlanScope,
    pub meal_type: MealType,
    pub calories: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// The plan was recorded and is ready to send.
    Delivered {
        record_id: i64,
        chunks: Vec<String>,
        meals_recorded: usize,
    },
    /// The provider reported a failure in-band. Shown as-is, nothing recorded.
    ProviderMessage { chunks: Vec<String> },
}

impl GenerationOutcome {
    pub fn chunks(&self) -> &[String] {
        match self {
            Self::Delivered { chunks, .. } | Self::ProviderMessage { chunks } => chunks,
        }
    }

    pub fn into_chunks(self) -> Vec<String> {
        match self {
            Self::Delivered { chunks, .. } | Self::ProviderMessage { chunks } => chunks,
        }
    }
}

pub struct Orchestrator {
    store: Arc<dyn Database>,
    entitlements: Entitlements,
    generator: Arc<dyn MealPlanGenerator>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Database>,
        generator: Arc<dyn MealPlanGenerator>,
        timeout: Duration,
    ) -> Self {
        Self {
            entitlements: Entitlements::new(store.clone()),
            store,
            generator,
            timeout,
        }
    }

    pub async fn run(&self, order: &GenerationOrder) -> Result<GenerationOutcome, CommandError> {
        self.run_at(order, Utc::now()).await
    }

    /// Run an order as of `now`. Preconditions are re-checked here because a
    /// subscription can lapse while the dialogue is in progress.
    pub async fn run_at(
        &self,
        order: &GenerationOrder,
        now: DateTime<Utc>,
    ) -> Result<GenerationOutcome, CommandError> {
        let user_id = order.user_id;
        let profile = self.entitlements.require(user_id, order.scope, now).await?;

        let recent = self
            .store
            .recent_meals(user_id, order.scope.meal_context_len())
            .await?;

        let request = GenerationRequest::new(
            &profile,
            order.scope,
            order.meal_type,
            order.calories,
            &recent,
        );

        let text = match tokio::time::timeout(self.timeout, self.generator.generate(&request)).await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(GenerationError::Timeout {
                    provider: self.generator.name().to_string(),
                    timeout: self.timeout,
                }
                .into());
            }
        };

        if is_error_output(&text) {
            warn!(user_id, scope = %order.scope, "Provider reported an in-band error");
            return Ok(GenerationOutcome::ProviderMessage {
                chunks: split_chunks(text.trim(), MAX_CHUNK_CHARS),
            });
        }

        let breakdown = breakdown::extract(&text);

        let meals: Vec<NewMeal> = breakdown
            .meals
            .into_iter()
            .map(|m| NewMeal {
                user_id,
                slot: m.slot,
                name: m.name,
                calories: m.calories,
                protein_g: m.protein_g,
                carbs_g: m.carbs_g,
                fat_g: m.fat_g,
                created_at: now,
            })
            .collect();

        let (record_id, meal_ids) = self
            .store
            .record_generation(
                &NewGeneration {
                    user_id,
                    scope: order.scope,
                    calories: order.calories,
                    meal_type: order.meal_type,
                    created_at: now,
                },
                &meals,
            )
            .await?;
        let meals_recorded = meal_ids.len();

        info!(
            user_id,
            scope = %order.scope,
            meal_type = order.meal_type.key(),
            calories = order.calories,
            record_id,
            meals_recorded,
            "Meal plan generated"
        );

        Ok(GenerationOutcome::Delivered {
            record_id,
            chunks: split_chunks(&breakdown.display, MAX_CHUNK_CHARS),
            meals_recorded,
        })
    }
}
