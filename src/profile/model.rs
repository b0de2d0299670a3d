//! User profile data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::choice::Choice;
use crate::error::ValidationError;

use super::bounds::{AGE, HEIGHT, WEIGHT};

/// Externally assigned, stable user identifier (the Telegram user id).
pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Choice for Gender {
    const FIELD: &'static str = "gender";
    const ALL: &'static [Self] = &[Self::Male, Self::Female];

    fn key(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

/// What the user wants the meal plan to achieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    LoseWeight,
    GainMuscle,
    Maintain,
}

impl Choice for Goal {
    const FIELD: &'static str = "goal";
    const ALL: &'static [Self] = &[Self::LoseWeight, Self::GainMuscle, Self::Maintain];

    fn key(&self) -> &'static str {
        match self {
            Self::LoseWeight => "lose_weight",
            Self::GainMuscle => "gain_muscle",
            Self::Maintain => "maintain",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::LoseWeight => "Lose weight",
            Self::GainMuscle => "Build muscle",
            Self::Maintain => "Maintain weight",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryRestriction {
    Vegan,
    GlutenFree,
    Omnivore,
}

impl Choice for DietaryRestriction {
    const FIELD: &'static str = "diet";
    const ALL: &'static [Self] = &[Self::Vegan, Self::GlutenFree, Self::Omnivore];

    fn key(&self) -> &'static str {
        match self {
            Self::Vegan => "vegan",
            Self::GlutenFree => "gluten_free",
            Self::Omnivore => "omnivore",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Vegan => "Vegan",
            Self::GlutenFree => "Gluten-free",
            Self::Omnivore => "No restrictions",
        }
    }
}

/// Stored profile. Replaced wholesale on every completed profile dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    pub weight_kg: u32,
    pub height_cm: u32,
    pub goal: Goal,
    pub dietary_restriction: DietaryRestriction,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Build a profile, rejecting any numeric field outside its bounds.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        age: u32,
        gender: Option<Gender>,
        weight_kg: u32,
        height_cm: u32,
        goal: Goal,
        dietary_restriction: DietaryRestriction,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            user_id,
            age: AGE.check(age)?,
            gender,
            weight_kg: WEIGHT.check(weight_kg)?,
            height_cm: HEIGHT.check(height_cm)?,
            goal,
            dietary_restriction,
            updated_at,
        })
    }

    /// Multi-line summary shown after the profile is saved.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "📊 Your profile:".to_string(),
            format!("👤 Age: {} years", self.age),
        ];
        if let Some(gender) = self.gender {
            lines.push(format!("👤 Gender: {}", gender.label()));
        }
        lines.push(format!("⚖️ Weight: {} kg", self.weight_kg));
        lines.push(format!("📏 Height: {} cm", self.height_cm));
        lines.push(format!("🎯 Goal: {}", self.goal.label()));
        lines.push(format!("🥗 Diet: {}", self.dietary_restriction.label()));
        lines.join("\n")
    }
}
