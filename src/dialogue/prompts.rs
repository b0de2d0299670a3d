//! User-facing prompts for each dialogue state.

use crate::channels::{Button, Keyboard, OutgoingResponse};
use crate::error::ValidationError;
use crate::generation::{MealType, PlanScope};
use crate::profile::bounds::{AGE, CALORIES, HEIGHT, WEIGHT};
use crate::profile::{DietaryRestriction, Gender, Goal, UserProfile};

use super::session::GENDER_SKIP_TOKEN;
use super::state::DialogueState;

fn gender_keyboard() -> Keyboard {
    Keyboard::for_choice::<Gender>().push_row(vec![Button::new("Skip", GENDER_SKIP_TOKEN)])
}

/// The question asked in `state`, with its keyboard for selection states.
pub fn prompt_for(state: DialogueState) -> OutgoingResponse {
    match state {
        DialogueState::AwaitingAge => {
            OutgoingResponse::text(format!("How old are you? ({})", AGE.hint()))
        }
        DialogueState::AwaitingGender => {
            OutgoingResponse::text("What is your gender?").with_keyboard(gender_keyboard())
        }
        DialogueState::AwaitingWeight => {
            OutgoingResponse::text(format!("What is your weight? ({})", WEIGHT.hint()))
        }
        DialogueState::AwaitingHeight => {
            OutgoingResponse::text(format!("What is your height? ({})", HEIGHT.hint()))
        }
        DialogueState::AwaitingGoal => OutgoingResponse::text("What is your goal?")
            .with_keyboard(Keyboard::for_choice::<Goal>()),
        DialogueState::AwaitingDietaryRestriction => {
            OutgoingResponse::text("Do you follow any dietary restriction?")
                .with_keyboard(Keyboard::for_choice::<DietaryRestriction>())
        }
        DialogueState::AwaitingMealType => OutgoingResponse::text("Choose the type of meal plan:")
            .with_keyboard(Keyboard::for_choice::<MealType>()),
        DialogueState::AwaitingCalories => OutgoingResponse::text(format!(
            "Enter your daily calorie target, e.g. 2000 ({})",
            CALORIES.hint()
        )),
        DialogueState::Committed => OutgoingResponse::default(),
    }
}

/// Explain why the input was rejected and ask again.
pub fn reprompt(state: DialogueState, error: &ValidationError) -> OutgoingResponse {
    let reason = match error {
        ValidationError::NotANumber { min, max, .. } | ValidationError::OutOfRange { min, max, .. } => {
            format!("❌ Please enter a whole number from {min} to {max}.")
        }
        ValidationError::UnknownToken { .. } | ValidationError::WrongInputKind { .. } => {
            "❌ Please choose one of the options below.".to_string()
        }
    };

    let mut response = prompt_for(state);
    match response.chunks.first_mut() {
        Some(first) => *first = format!("{reason}\n{first}"),
        None => response.chunks.push(reason),
    }
    response
}

/// Opening of a `/profile` for a user who already has one.
pub fn existing_profile(profile: &UserProfile) -> OutgoingResponse {
    OutgoingResponse::text(format!(
        "You already have a profile:\n\n{}\n\nLet's update your goal and diet; \
         everything else is kept.\nWhat is your goal?",
        profile.summary()
    ))
    .with_keyboard(Keyboard::for_choice::<Goal>())
}

pub fn profile_saved(profile: &UserProfile) -> OutgoingResponse {
    OutgoingResponse::text(format!(
        "✅ Profile saved!\n\n{}\n\nUse /generateforday to get a meal plan.",
        profile.summary()
    ))
}

/// Opening of a generation dialogue.
pub fn generation_started(scope: PlanScope) -> OutgoingResponse {
    let mut response = prompt_for(DialogueState::AwaitingMealType);
    if let Some(first) = response.chunks.first_mut() {
        let title = match scope {
            PlanScope::Daily => "🍽 Daily meal plan",
            PlanScope::Weekly => "📅 Weekly meal plan",
        };
        *first = format!("{title}\n{first}");
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_states_carry_keyboards() {
        for state in [
            DialogueState::AwaitingGender,
            DialogueState::AwaitingGoal,
            DialogueState::AwaitingDietaryRestriction,
            DialogueState::AwaitingMealType,
        ] {
            assert!(prompt_for(state).keyboard.is_some(), "{state} needs a keyboard");
        }
        for state in [
            DialogueState::AwaitingAge,
            DialogueState::AwaitingWeight,
            DialogueState::AwaitingHeight,
            DialogueState::AwaitingCalories,
        ] {
            assert!(prompt_for(state).keyboard.is_none());
        }
    }

    #[test]
    fn gender_keyboard_offers_skip() {
        let response = prompt_for(DialogueState::AwaitingGender);
        let keyboard = response.keyboard.unwrap();
        let tokens: Vec<&str> = keyboard.tokens().collect();
        assert_eq!(tokens, vec!["gender:male", "gender:female", GENDER_SKIP_TOKEN]);
    }

    #[test]
    fn reprompt_names_the_range() {
        let err = AGE.parse("14").unwrap_err();
        let response = reprompt(DialogueState::AwaitingAge, &err);
        let text = response.content();
        assert!(text.contains("15 to 100"));
        assert!(text.contains("How old are you?"));
    }

    #[test]
    fn reprompt_for_selection_keeps_keyboard() {
        let err = ValidationError::UnknownToken {
            field: "goal".into(),
            token: "goal:fly".into(),
        };
        let response = reprompt(DialogueState::AwaitingGoal, &err);
        assert!(response.keyboard.is_some());
        assert!(response.content().starts_with("❌"));
    }
}
