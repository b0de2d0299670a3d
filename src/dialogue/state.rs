//! Dialogue state machine: which field the user is being asked for.

use serde::{Deserialize, Serialize};

use crate::choice::Choice;
use crate::generation::{MealType, PlanScope};
use crate::profile::bounds::{AGE, CALORIES, HEIGHT, WEIGHT};
use crate::profile::{DietaryRestriction, Gender, Goal, NumericBounds};

/// Which flow a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueFlow {
    Profile,
    Generation(PlanScope),
}

impl DialogueFlow {
    /// First state of a fresh session.
    pub fn initial_state(&self) -> DialogueState {
        match self {
            Self::Profile => DialogueState::AwaitingAge,
            Self::Generation(_) => DialogueState::AwaitingMealType,
        }
    }
}

/// The states of both dialogue flows.
///
/// Profile: AwaitingAge → AwaitingGender → AwaitingWeight → AwaitingHeight →
/// AwaitingGoal → AwaitingDietaryRestriction → Committed.
///
/// Generation: AwaitingMealType → AwaitingCalories → Committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    AwaitingAge,
    AwaitingGender,
    AwaitingWeight,
    AwaitingHeight,
    AwaitingGoal,
    AwaitingDietaryRestriction,
    AwaitingMealType,
    AwaitingCalories,
    Committed,
}

/// The kind of input a state accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedInput {
    /// Typed integer within bounds.
    Numeric(NumericBounds),
    /// A keyboard token whose prefix is the given field.
    Selection(&'static str),
}

impl DialogueState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: DialogueState) -> bool {
        use DialogueState::*;
        matches!(
            (self, target),
            (AwaitingAge, AwaitingGender)
                | (AwaitingGender, AwaitingWeight)
                | (AwaitingWeight, AwaitingHeight)
                | (AwaitingHeight, AwaitingGoal)
                | (AwaitingGoal, AwaitingDietaryRestriction)
                | (AwaitingDietaryRestriction, Committed)
                | (AwaitingMealType, AwaitingCalories)
                | (AwaitingCalories, Committed)
        )
    }

    /// Whether this state is terminal (fields are ready to commit).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Get the next state in the linear progression, if any.
    pub fn next(&self) -> Option<DialogueState> {
        use DialogueState::*;
        match self {
            AwaitingAge => Some(AwaitingGender),
            AwaitingGender => Some(AwaitingWeight),
            AwaitingWeight => Some(AwaitingHeight),
            AwaitingHeight => Some(AwaitingGoal),
            AwaitingGoal => Some(AwaitingDietaryRestriction),
            AwaitingDietaryRestriction => Some(Committed),
            AwaitingMealType => Some(AwaitingCalories),
            AwaitingCalories => Some(Committed),
            Committed => None,
        }
    }

    pub fn expected_input(&self) -> Option<ExpectedInput> {
        use DialogueState::*;
        match self {
            AwaitingAge => Some(ExpectedInput::Numeric(AGE)),
            AwaitingGender => Some(ExpectedInput::Selection(Gender::FIELD)),
            AwaitingWeight => Some(ExpectedInput::Numeric(WEIGHT)),
            AwaitingHeight => Some(ExpectedInput::Numeric(HEIGHT)),
            AwaitingGoal => Some(ExpectedInput::Selection(Goal::FIELD)),
            AwaitingDietaryRestriction => Some(ExpectedInput::Selection(DietaryRestriction::FIELD)),
            AwaitingMealType => Some(ExpectedInput::Selection(MealType::FIELD)),
            AwaitingCalories => Some(ExpectedInput::Numeric(CALORIES)),
            Committed => None,
        }
    }
}

impl std::fmt::Display for DialogueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingAge => "awaiting_age",
            Self::AwaitingGender => "awaiting_gender",
            Self::AwaitingWeight => "awaiting_weight",
            Self::AwaitingHeight => "awaiting_height",
            Self::AwaitingGoal => "awaiting_goal",
            Self::AwaitingDietaryRestriction => "awaiting_dietary_restriction",
            Self::AwaitingMealType => "awaiting_meal_type",
            Self::AwaitingCalories => "awaiting_calories",
            Self::Committed => "committed",
        };
        write!(f, "{s}")
    }
}
