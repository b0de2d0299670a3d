//! The provider-facing description of one meal plan.

use serde::Serialize;

use crate::choice::Choice;
use crate::profile::{DietaryRestriction, Gender, Goal, UserProfile};

use super::model::{MealRecord, MealType, PlanScope};

/// Language tag of the fenced block carrying the machine-readable meals.
pub const MEALS_BLOCK_TAG: &str = "meals";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub age: u32,
    pub gender: Option<Gender>,
    pub weight_kg: u32,
    pub height_cm: u32,
    pub goal: Goal,
    pub dietary_restriction: DietaryRestriction,
    pub target_calories: u32,
    pub meal_type: MealType,
    pub day_count: u32,
    /// Recent meals, newest first, so the plan can avoid repeating them.
    pub existing_meals: Vec<String>,
}

impl GenerationRequest {
    pub fn new(
        profile: &UserProfile,
        scope: PlanScope,
        meal_type: MealType,
        target_calories: u32,
        recent_meals: &[MealRecord],
    ) -> Self {
        Self {
            age: profile.age,
            gender: profile.gender,
            weight_kg: profile.weight_kg,
            height_cm: profile.height_cm,
            goal: profile.goal,
            dietary_restriction: profile.dietary_restriction,
            target_calories,
            meal_type,
            day_count: scope.day_count(),
            existing_meals: recent_meals.iter().map(MealRecord::describe).collect(),
        }
    }

    /// Render the request as a single prompt.
    pub fn to_prompt(&self) -> String {
        let period = if self.day_count == 1 {
            "one day".to_string()
        } else {
            format!("{} days", self.day_count)
        };

        let mut prompt = format!(
            "You are an experienced dietitian. Create a meal plan for {period}.\n\n\
             Client:\n\
             - Age: {} years\n",
            self.age
        );
        if let Some(gender) = self.gender {
            prompt.push_str(&format!("- Gender: {}\n", gender.label()));
        }
        prompt.push_str(&format!(
            "- Weight: {} kg\n\
             - Height: {} cm\n\
             - Goal: {}\n\
             - Dietary restriction: {}\n\
             - Calories per day: {}\n\
             - Meal style: {}\n",
            self.weight_kg,
            self.height_cm,
            self.goal.label(),
            self.dietary_restriction.label(),
            self.target_calories,
            self.meal_type.label(),
        ));

        if !self.existing_meals.is_empty() {
            prompt.push_str("\nRecently suggested meals (avoid repeating them):\n");
            for meal in &self.existing_meals {
                prompt.push_str(&format!("- {meal}\n"));
            }
        }

        prompt.push_str(
            "\nFor every day include breakfast, lunch, dinner and 2-3 snacks. \
             For every meal give the dish name, calories, approximate ingredients \
             and the time to eat it. Format the answer as structured text with emoji.\n",
        );
        prompt.push_str(&format!(
            "\nAfter the plan, add a fenced code block tagged `{MEALS_BLOCK_TAG}` containing \
             a JSON array with one object per meal: \
             {{\"slot\": string, \"name\": string, \"calories\": integer, \
             \"protein_g\": integer, \"carbs_g\": integer, \"fat_g\": integer}}.\n"
        ));
        prompt
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn profile(gender: Option<Gender>) -> UserProfile {
        UserProfile::new(
            1,
            35,
            gender,
            90,
            185,
            Goal::LoseWeight,
            DietaryRestriction::GlutenFree,
            Utc::now(),
        )
        .unwrap()
    }

    fn meal(name: &str) -> MealRecord {
        MealRecord {
            id: 1,
            user_id: 1,
            slot: "Dinner".into(),
            name: name.into(),
            calories: 500,
            protein_g: 30,
            carbs_g: 40,
            fat_g: 15,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn request_copies_profile_and_scope() {
        let req = GenerationRequest::new(
            &profile(Some(Gender::Male)),
            PlanScope::Weekly,
            MealType::LowCarb,
            2100,
            &[meal("Chicken curry")],
        );
        assert_eq!(req.day_count, 7);
        assert_eq!(req.target_calories, 2100);
        assert_eq!(req.goal, Goal::LoseWeight);
        assert_eq!(req.existing_meals, vec!["Dinner: Chicken curry (500 kcal)"]);
    }

    #[test]
    fn prompt_mentions_every_field() {
        let req = GenerationRequest::new(
            &profile(Some(Gender::Female)),
            PlanScope::Daily,
            MealType::Mediterranean,
            1800,
            &[meal("Greek salad")],
        );
        let prompt = req.to_prompt();
        for needle in [
            "one day",
            "35 years",
            "Female",
            "90 kg",
            "185 cm",
            "Lose weight",
            "Gluten-free",
            "1800",
            "Mediterranean",
            "Greek salad",
            "`meals`",
        ] {
            assert!(prompt.contains(needle), "prompt is missing {needle:?}");
        }
    }

    #[test]
    fn prompt_without_gender_or_history() {
        let req = GenerationRequest::new(
            &profile(None),
            PlanScope::Weekly,
            MealType::Balanced,
            2500,
            &[],
        );
        let prompt = req.to_prompt();
        assert!(prompt.contains("7 days"));
        assert!(!prompt.contains("Gender"));
        assert!(!prompt.contains("Recently suggested"));
    }
}
