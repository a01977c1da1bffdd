//! Gemini REST client for text generation.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ModelSettings;

/// A single generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub prompt: String,
    /// Ask the backend to emit JSON directly.
    pub json_response: bool,
}

impl ModelRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json_response: false,
        }
    }

    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json_response: true,
        }
    }
}

/// Something that turns a prompt into one completion.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: &ModelRequest) -> Result<String>;
}

/// Client for the `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    /// Returns `None` when no credential is configured.
    pub fn from_settings(settings: &ModelSettings) -> Option<Self> {
        let api_key = settings.api_key.clone()?;
        Some(Self {
            client: Client::new(),
            api_key,
            model: settings.model.clone(),
            api_base: settings.api_base.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait::async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &ModelRequest) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: request.json_response.then(|| GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };

        debug!(
            "Sending request to Gemini: model={} prompt_chars={} json={}",
            self.model,
            request.prompt.chars().count(),
            request.json_response
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        if let Some(usage) = &response.usage_metadata {
            info!(
                "Gemini response: {} tokens (prompt: {}, completion: {})",
                usage.total_token_count, usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(response.first_text())
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
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
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`, empty if any level is missing.
    fn first_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UsageMetadata {
    prompt_token_count: u32,
    candidates_token_count: u32,
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        response::Json,
        routing::post,
        Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, String, serde_json::Value)>>>;

    /// Spawn a fake Gemini endpoint that records requests and returns `reply`.
    async fn fake_gemini(status: StatusCode, reply: serde_json::Value) -> (String, Seen) {
        let seen: Seen = Arc::default();

        let handler = move |State(seen): State<Seen>,
                            Path(model): Path<String>,
                            Query(query): Query<HashMap<String, String>>,
                            Json(body): Json<serde_json::Value>| {
            let reply = reply.clone();
            async move {
                let key = query.get("key").cloned().unwrap_or_default();
                seen.lock().unwrap().push((model, key, body));
                (status, Json(reply))
            }
        };

        let app = Router::new()
            .route("/v1beta/models/:model", post(handler))
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v1beta", addr), seen)
    }

    fn client_for(api_base: String) -> GeminiClient {
        GeminiClient::from_settings(&ModelSettings {
            api_key: Some("test-key".to_string()),
            model: "gemini-test".to_string(),
            api_base,
        })
        .unwrap()
    }

    #[test]
    fn test_no_key_no_client() {
        let settings = ModelSettings {
            api_key: None,
            model: "m".to_string(),
            api_base: "http://localhost".to_string(),
        };
        assert!(GeminiClient::from_settings(&settings).is_none());
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hi".to_string() }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "contents": [{"parts": [{"text": "hi"}]}],
                "generationConfig": {"responseMimeType": "application/json"}
            })
        );
    }

    #[test]
    fn test_missing_candidates_is_empty_text() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({"candidates": []})).unwrap();
        assert_eq!(response.first_text(), "");

        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]}))
                .unwrap();
        assert_eq!(response.first_text(), "");
    }

    #[tokio::test]
    async fn test_generate_reads_first_candidate() {
        let (base, seen) = fake_gemini(
            StatusCode::OK,
            serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Two years."}, {"text": "ignored"}]}}],
                "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 3, "totalTokenCount": 13}
            }),
        )
        .await;

        let client = client_for(base);
        let text = client.generate(&ModelRequest::text("prompt")).await.unwrap();
        assert_eq!(text, "Two years.");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (model, key, body) = &seen[0];
        assert_eq!(model, "gemini-test:generateContent");
        assert_eq!(key, "test-key");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt");
        assert!(body.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn test_json_hint_sent() {
        let (base, seen) = fake_gemini(StatusCode::OK, serde_json::json!({"candidates": []})).await;
        let client = client_for(base);
        let text = client.generate(&ModelRequest::json("p")).await.unwrap();
        assert_eq!(text, "");
        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0].2["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_error_status_is_error() {
        let (base, _) = fake_gemini(
            StatusCode::TOO_MANY_REQUESTS,
            serde_json::json!({"error": {"message": "quota"}}),
        )
        .await;
        let err = client_for(base)
            .generate(&ModelRequest::text("p"))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("429"), "{}", message);
        assert!(message.contains("quota"), "{}", message);
    }
}
