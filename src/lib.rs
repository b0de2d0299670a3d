//! Meal plan bot: profile dialogues, subscriptions and AI-generated meal
//! plans over chat channels.

pub mod analytics;
pub mod bot;
pub mod channels;
pub mod choice;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod generation;
pub mod profile;
pub mod routes;
pub mod store;
pub mod subscription;
