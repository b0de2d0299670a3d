//! Meal plan generation: request building, the provider seam, the Gemini
//! client and the orchestrator that commits successful plans.

pub mod breakdown;
pub mod chunking;
pub mod gemini;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod request;

pub use chunking::{MAX_CHUNK_CHARS, split_chunks};
pub use gemini::GeminiGenerator;
pub use model::{GenerationRecord, MealRecord, MealType, NewGeneration, NewMeal, PlanScope};
pub use orchestrator::{GenerationOrder, GenerationOutcome, Orchestrator};
pub use provider::{ERROR_SENTINEL, MealPlanGenerator, is_error_output};
pub use request::GenerationRequest;
