//! In-memory dialogue sessions and the per-user session table.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::choice::Choice;
use crate::error::ValidationError;
use crate::generation::{GenerationOrder, MealType};
use crate::profile::{DietaryRestriction, Gender, Goal, UserId, UserProfile};

use super::state::{DialogueFlow, DialogueState, ExpectedInput};

/// Token offered next to the gender buttons to leave gender unset.
pub const GENDER_SKIP_TOKEN: &str = "gender:skip";

/// Dialogue input, already classified by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueInput<'a> {
    Text(&'a str),
    Selection(&'a str),
}

/// Fields collected so far. Each is set by exactly one state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedFields {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub weight_kg: Option<u32>,
    pub height_cm: Option<u32>,
    pub goal: Option<Goal>,
    pub dietary_restriction: Option<DietaryRestriction>,
    pub meal_type: Option<MealType>,
    pub calories: Option<u32>,
}

impl BufferedFields {
    /// Seed every profile field from a stored profile.
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            age: Some(profile.age),
            gender: profile.gender,
            weight_kg: Some(profile.weight_kg),
            height_cm: Some(profile.height_cm),
            goal: Some(profile.goal),
            dietary_restriction: Some(profile.dietary_restriction),
            ..Default::default()
        }
    }

    /// Build a profile, or `None` if a required field is missing or invalid.
    pub fn to_profile(&self, user_id: UserId, now: DateTime<Utc>) -> Option<UserProfile> {
        UserProfile::new(
            user_id,
            self.age?,
            self.gender,
            self.weight_kg?,
            self.height_cm?,
            self.goal?,
            self.dietary_restriction?,
            now,
        )
        .ok()
    }

    fn set_number(&mut self, state: DialogueState, value: u32) {
        match state {
            DialogueState::AwaitingAge => self.age = Some(value),
            DialogueState::AwaitingWeight => self.weight_kg = Some(value),
            DialogueState::AwaitingHeight => self.height_cm = Some(value),
            DialogueState::AwaitingCalories => self.calories = Some(value),
            _ => {}
        }
    }

    fn set_selection(&mut self, state: DialogueState, token: &str) -> Result<(), ValidationError> {
        match state {
            DialogueState::AwaitingGender => {
                self.gender = if token.trim() == GENDER_SKIP_TOKEN {
                    None
                } else {
                    Some(Gender::from_token(token)?)
                };
            }
            DialogueState::AwaitingGoal => self.goal = Some(Goal::from_token(token)?),
            DialogueState::AwaitingDietaryRestriction => {
                self.dietary_restriction = Some(DietaryRestriction::from_token(token)?)
            }
            DialogueState::AwaitingMealType => self.meal_type = Some(MealType::from_token(token)?),
            _ => {}
        }
        Ok(())
    }
}

/// One user's in-flight dialogue. Never persisted.
#[derive(Debug, Clone)]
pub struct DialogueSession {
    pub user_id: UserId,
    pub flow: DialogueFlow,
    pub state: DialogueState,
    pub fields: BufferedFields,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl DialogueSession {
    pub fn new(user_id: UserId, flow: DialogueFlow, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            flow,
            state: flow.initial_state(),
            fields: BufferedFields::default(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Validate `input` against the current state. On success the field is
    /// buffered and the session advances; on failure nothing changes.
    pub fn accept(&mut self, input: DialogueInput<'_>) -> Result<DialogueState, ValidationError> {
        let Some(expected) = self.state.expected_input() else {
            return Err(ValidationError::WrongInputKind {
                expected: "no further input".to_string(),
            });
        };

        match (expected, input) {
            (ExpectedInput::Numeric(bounds), DialogueInput::Text(text)) => {
                let value = bounds.parse(text)?;
                self.fields.set_number(self.state, value);
            }
            (ExpectedInput::Numeric(bounds), DialogueInput::Selection(_)) => {
                return Err(ValidationError::WrongInputKind {
                    expected: format!("a number ({})", bounds.hint()),
                });
            }
            (ExpectedInput::Selection(_), DialogueInput::Selection(token)) => {
                self.fields.set_selection(self.state, token)?;
            }
            (ExpectedInput::Selection(field), DialogueInput::Text(_)) => {
                return Err(ValidationError::WrongInputKind {
                    expected: format!("a {field} option from the buttons"),
                });
            }
        }

        let Some(next) = self.state.next().filter(|n| self.state.can_transition_to(*n)) else {
            return Err(ValidationError::WrongInputKind {
                expected: "no further input".to_string(),
            });
        };
        self.state = next;
        Ok(next)
    }

    /// The order a committed generation session stands for.
    pub fn to_order(&self) -> Option<GenerationOrder> {
        match self.flow {
            DialogueFlow::Generation(scope) => Some(GenerationOrder {
                user_id: self.user_id,
                scope,
                meal_type: self.fields.meal_type?,
                calories: self.fields.calories?,
            }),
            DialogueFlow::Profile => None,
        }
    }

    pub fn is_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> bool {
        let max_idle = chrono::Duration::from_std(max_idle).unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(self.last_activity) > max_idle
    }
}

/// A user's session slot. `None` when no dialogue is in progress.
pub type Slot = Option<DialogueSession>;

/// Map of per-user session slots.
///
/// The outer lock is held only long enough to look up or create a slot;
/// each slot has its own lock that serializes one user's events.
#[derive(Default)]
pub struct SessionTable {
    slots: Mutex<HashMap<UserId, Arc<Mutex<Slot>>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's slot, created empty on first use.
    pub async fn slot(&self, user_id: UserId) -> Arc<Mutex<Slot>> {
        let mut slots = self.slots.lock().await;
        slots.entry(user_id).or_default().clone()
    }

    /// Current state of the user's session, if any.
    pub async fn state_of(&self, user_id: UserId) -> Option<DialogueState> {
        let slot = self.slots.lock().await.get(&user_id).cloned()?;
        let guard = slot.lock().await;
        guard.as_ref().map(|s| s.state)
    }

    /// Number of users with an active session.
    pub async fn active_count(&self) -> usize {
        let slots: Vec<_> = self.slots.lock().await.values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    /// Evict sessions idle for longer than `max_idle` and drop empty slots.
    /// Returns how many sessions were evicted.
    ///
    /// Slots that are locked are in use and left alone.
    pub async fn prune_stale(&self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let mut slots = self.slots.lock().await;
        let mut evicted = 0;

        slots.retain(|user_id, slot| {
            let Ok(mut guard) = slot.try_lock() else {
                return true;
            };
            if guard.as_ref().is_some_and(|s| s.is_idle(max_idle, now)) {
                debug!(user_id, "Evicting idle dialogue session");
                *guard = None;
                evicted += 1;
            }
            // Clones are only handed out under the outer lock, which we hold,
            // so a count of one means nobody else can reach this slot.
            guard.is_some() || Arc::strong_count(slot) > 1
        });

        evicted
    }
}
