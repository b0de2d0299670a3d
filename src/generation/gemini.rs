//! Google Gemini REST client.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::error::GenerationError;

use super::provider::{ERROR_SENTINEL, MealPlanGenerator};
use super::request::GenerationRequest;

const PROVIDER: &str = "gemini";

/// Meal plan generator backed by `models/{model}:generateContent`.
pub struct GeminiGenerator {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Turn a decoded response into plan text. A blocked prompt or an empty
/// candidate becomes sentinel text rather than an error.
fn response_text(response: GenerateContentResponse) -> String {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return format!("{ERROR_SENTINEL} the request was blocked ({reason})");
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return format!("{ERROR_SENTINEL} the model returned no answer");
    };

    let text: String = candidate
        .content
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        return format!("{ERROR_SENTINEL} the model returned an empty answer ({reason})");
    }
    text
}

#[async_trait]
impl MealPlanGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.to_prompt(),
                }],
            }],
        };

        debug!(model = %self.config.model, days = request.day_count, "Requesting meal plan");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GenerationError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Gemini returned an error status");
            return Err(GenerationError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {status}: {text}"),
            });
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: e.to_string(),
                })?;

        Ok(response_text(parsed))
    }
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use chrono::Utc;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::generation::{MealType, PlanScope, is_error_output};
    use crate::profile::{DietaryRestriction, Goal, UserProfile};

    fn request() -> GenerationRequest {
        let profile = UserProfile::new(
            1,
            40,
            None,
            75,
            170,
            Goal::Maintain,
            DietaryRestriction::Omnivore,
            Utc::now(),
        )
        .unwrap();
        GenerationRequest::new(&profile, PlanScope::Daily, MealType::Balanced, 2000, &[])
    }

    fn config(base_url: String) -> GeminiConfig {
        GeminiConfig {
            api_key: SecretString::from("test-key".to_string()),
            model: "gemini-test".to_string(),
            base_url,
        }
    }

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn endpoint_includes_model() {
        let generator = GeminiGenerator::new(config("https://example.test".into()));
        assert_eq!(
            generator.endpoint(),
            "https://example.test/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn response_text_joins_parts() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Breakfast: " }, { "text": "oats" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response_text(parsed), "Breakfast: oats");
    }

    #[test]
    fn blocked_prompt_is_sentinel_text() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        let text = response_text(parsed);
        assert!(is_error_output(&text));
        assert!(text.contains("SAFETY"));
    }

    #[test]
    fn empty_candidate_is_sentinel_text() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "MAX_TOKENS" }]
        }))
        .unwrap();
        assert!(is_error_output(&response_text(parsed)));

        let none: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(is_error_output(&response_text(none)));
    }

    #[tokio::test]
    async fn generate_against_local_server() {
        let router = Router::new().route(
            "/v1beta/models/gemini-test:generateContent",
            post(|headers: axum::http::HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["x-goog-api-key"], "test-key");
                let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
                assert!(prompt.contains("2000"));
                Json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "🍳 Plan" }] } }]
                }))
            }),
        );
        let base = serve(router).await;

        let generator = GeminiGenerator::new(config(base));
        let text = generator.generate(&request()).await.unwrap();
        assert_eq!(text, "🍳 Plan");
    }

    #[tokio::test]
    async fn auth_and_server_errors_are_generation_errors() {
        let router = Router::new()
            .route(
                "/v1beta/models/gemini-test:generateContent",
                post(|| async { (AxumStatus::FORBIDDEN, "denied") }),
            )
            .route(
                "/v1beta/models/gemini-broken:generateContent",
                post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let base = serve(router).await;

        let denied = GeminiGenerator::new(config(base.clone()));
        assert!(matches!(
            denied.generate(&request()).await,
            Err(GenerationError::AuthFailed { .. })
        ));

        let mut broken_config = config(base);
        broken_config.model = "gemini-broken".to_string();
        let broken = GeminiGenerator::new(broken_config);
        match broken.generate(&request()).await {
            Err(GenerationError::RequestFailed { reason, .. }) => assert!(reason.contains("500")),
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_request_failed() {
        // Port 9 (discard) on localhost is not serving HTTP.
        let generator = GeminiGenerator::new(config("http://127.0.0.1:9".into()));
        assert!(matches!(
            generator.generate(&request()).await,
            Err(GenerationError::RequestFailed { .. })
        ));
    }
}
