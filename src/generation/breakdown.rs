//! Extraction of the machine-readable meal list from plan text.
//!
//! The model is asked to append a fenced block tagged `meals` holding a JSON
//! array. The block is stripped from what the user sees; its entries become
//! meal records. A missing or malformed block only costs the meal history.

use serde::Deserialize;
use tracing::warn;

use super::request::MEALS_BLOCK_TAG;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MealEntry {
    pub slot: String,
    pub name: String,
    #[serde(default)]
    pub calories: u32,
    #[serde(default)]
    pub protein_g: u32,
    #[serde(default)]
    pub carbs_g: u32,
    #[serde(default)]
    pub fat_g: u32,
}

/// Plan text split into the part shown to the user and the parsed meals.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub display: String,
    pub meals: Vec<MealEntry>,
}

pub fn extract(text: &str) -> Breakdown {
    let opener = format!("```{MEALS_BLOCK_TAG}");
    let Some(start) = text.find(&opener) else {
        return Breakdown {
            display: text.trim_end().to_string(),
            meals: Vec::new(),
        };
    };

    let body_start = start + opener.len();
    let (body, after) = match text[body_start..].find("```") {
        Some(end) => (
            &text[body_start..body_start + end],
            &text[body_start + end + 3..],
        ),
        // Unterminated block: everything after the opener is the body.
        None => (&text[body_start..], ""),
    };

    let meals = match serde_json::from_str::<Vec<MealEntry>>(body.trim()) {
        Ok(meals) => meals,
        Err(e) => {
            warn!(error = %e, "Discarding malformed meals block");
            Vec::new()
        }
    };

    let mut display = text[..start].trim_end().to_string();
    let rest = after.trim();
    if !rest.is_empty() {
        display.push_str("\n\n");
        display.push_str(rest);
    }

    Breakdown { display, meals }
}
