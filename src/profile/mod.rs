//! User profile: physiological data collected by the profile dialogue.

pub mod bounds;
pub mod model;

pub use bounds::NumericBounds;
pub use model::{DietaryRestriction, Gender, Goal, UserId, UserProfile};
