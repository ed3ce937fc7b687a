use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::GeminiConfig;
use crate::error::{Result, StudyError};
use crate::models::ImageInput;

/// Upstream error bodies are cut to this many characters before surfacing
const MAX_ERROR_BODY_CHARS: usize = 1000;

/// A fully built prompt, ready to be sent to a generative model
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub prompt: String,
    pub image: Option<ImageInput>,
    pub max_output_tokens: u32,
}

/// Anything that turns a [`ContentRequest`] into the model's raw reply text
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &ContentRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

impl GenerateContentRequest {
    pub fn from_content(request: &ContentRequest, temperature: f32) -> Self {
        let mut parts = vec![Part::Text {
            text: request.prompt.clone(),
        }];
        if let Some(image) = &request.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: STANDARD.encode(&image.data),
                },
            });
        }

        Self {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: request.max_output_tokens,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Reply text at `candidates[0].content.parts[0].text`
    pub fn into_text(self) -> Result<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(StudyError::EmptyResponse)
    }
}

/// `generateContent` client. One POST per call: no retries, no explicit timeout.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: GeminiConfig, http: Client) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &ContentRequest) -> Result<String> {
        let payload = GenerateContentRequest::from_content(request, self.config.temperature);
        debug!(
            "Calling {} ({} prompt chars, image: {}, max tokens: {})",
            self.config.model,
            request.prompt.chars().count(),
            request.image.is_some(),
            request.max_output_tokens
        );

        let url = format!("{}?key={}", self.config.generate_url(), self.config.api_key);
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(StudyError::http)?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            error!("Gemini API request failed: {}", status);
            return Err(StudyError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateContentResponse = response.json().await.map_err(StudyError::http)?;
        reply.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_only_envelope() {
        let request = ContentRequest {
            prompt: "Analyze this".to_string(),
            image: None,
            max_output_tokens: 1500,
        };
        let payload = serde_json::to_value(GenerateContentRequest::from_content(&request, 0.7))
            .unwrap();

        assert_eq!(payload["contents"][0]["parts"], json!([{"text": "Analyze this"}]));
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], 1500);
        assert!((payload["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_image_envelope() {
        let request = ContentRequest {
            prompt: "Describe".to_string(),
            image: Some(ImageInput::new("image/jpeg", vec![1, 2, 3])),
            max_output_tokens: 2000,
        };
        let payload = serde_json::to_value(GenerateContentRequest::from_content(&request, 0.7))
            .unwrap();

        let parts = payload["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "AQID");
    }

    #[test]
    fn test_reply_text_extraction() {
        let reply: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"summary\": \"x\"}"}]}}]
        }))
        .unwrap();
        assert_eq!(reply.into_text().unwrap(), "{\"summary\": \"x\"}");
    }

    #[test]
    fn test_missing_reply_text_is_empty_response() {
        for body in [
            json!({}),
            json!({"candidates": []}),
            json!({"candidates": [{"finishReason": "SAFETY"}]}),
            json!({"candidates": [{"content": {"parts": []}}]}),
            json!({"candidates": [{"content": {"parts": [{"text": "   "}]}}]}),
        ] {
            let reply: GenerateContentResponse = serde_json::from_value(body).unwrap();
            assert!(matches!(reply.into_text(), Err(StudyError::EmptyResponse)));
        }
    }
}
