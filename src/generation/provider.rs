//! The provider seam for meal plan text generation.

use async_trait::async_trait;

use crate::error::GenerationError;

use super::request::GenerationRequest;

/// Prefix of provider output that reports a failure in-band. Such output is
/// shown to the user verbatim and never recorded as a generation.
pub const ERROR_SENTINEL: &str = "Error generating meal plan:";

/// Produces meal plan text for a request.
///
/// `Err` is a transport-level failure (the orchestrator hides the details
/// from the user). A provider that got an answer it cannot use may instead
/// return text starting with [`ERROR_SENTINEL`].
#[async_trait]
pub trait MealPlanGenerator: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

pub fn is_error_output(text: &str) -> bool {
    text.trim_start().starts_with(ERROR_SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_detection() {
        assert!(is_error_output("Error generating meal plan: quota exceeded"));
        assert!(is_error_output("  Error generating meal plan: blocked"));
        assert!(!is_error_output("🍳 Breakfast: omelette"));
        assert!(!is_error_output("Plan\nError generating meal plan: not at start"));
    }
}
