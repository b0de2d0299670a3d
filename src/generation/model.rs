//! Generation history and meal records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::choice::Choice;
use crate::profile::UserId;

/// How many days a plan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanScope {
    Daily,
    Weekly,
}

impl PlanScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    pub fn day_count(&self) -> u32 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
        }
    }

    /// How many recent meals are fed back into the request.
    pub fn meal_context_len(&self) -> usize {
        match self {
            Self::Daily => 5,
            Self::Weekly => 20,
        }
    }

    pub fn requires_subscription(&self) -> bool {
        matches!(self, Self::Weekly)
    }
}

impl fmt::Display for PlanScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(format!("unknown plan scope: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Balanced,
    HighProtein,
    LowCarb,
    Mediterranean,
}

impl Choice for MealType {
    const FIELD: &'static str = "meal";
    const ALL: &'static [Self] = &[
        Self::Balanced,
        Self::HighProtein,
        Self::LowCarb,
        Self::Mediterranean,
    ];

    fn key(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::HighProtein => "high_protein",
            Self::LowCarb => "low_carb",
            Self::Mediterranean => "mediterranean",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Balanced => "Balanced",
            Self::HighProtein => "High protein",
            Self::LowCarb => "Low carb",
            Self::Mediterranean => "Mediterranean",
        }
    }
}

/// A generation about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGeneration {
    pub user_id: UserId,
    pub scope: PlanScope,
    pub calories: u32,
    pub meal_type: MealType,
    pub created_at: DateTime<Utc>,
}

/// A recorded, successful generation. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRecord {
    pub id: i64,
    pub user_id: UserId,
    pub scope: PlanScope,
    pub calories: u32,
    pub meal_type: MealType,
    pub created_at: DateTime<Utc>,
}

/// One meal from a plan's machine-readable breakdown, before storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub user_id: UserId,
    pub slot: String,
    pub name: String,
    pub calories: u32,
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealRecord {
    pub id: i64,
    pub user_id: UserId,
    pub slot: String,
    pub name: String,
    pub calories: u32,
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
    pub created_at: DateTime<Utc>,
}

impl MealRecord {
    /// One-line description used as context for the next request.
    pub fn describe(&self) -> String {
        format!("{}: {} ({} kcal)", self.slot, self.name, self.calories)
    }
}
