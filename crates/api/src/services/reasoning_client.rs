//! Chat-completions reasoning client.
//!
//! Implements the domain `ReasoningService` against any OpenAI-compatible
//! `/chat/completions` endpoint (Groq by default). Retries and per-attempt
//! deadlines belong to the caller's `RetryPolicy`; this client makes exactly
//! one HTTP request per call.

use std::time::Duration;

use async_trait::async_trait;
use domain::services::reasoning::extract_json_object;
use domain::services::{
    ClassificationRequest, ModelClassification, ReasoningError, ReasoningService,
    RecommendationRequest,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ReasoningConfig;

const SYSTEM_PROMPT: &str =
    "You are PowerGuard, an Android battery and data optimization assistant. Reply with a single JSON object.";

/// Longest error body kept in `ReasoningError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// Error type for client construction.
#[derive(Debug, thiserror::Error)]
pub enum ReasoningClientError {
    #[error("Reasoning service is not enabled")]
    NotEnabled,

    #[error("Reasoning API key is not configured")]
    MissingApiKey,

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_ms: u64,
}

impl ChatCompletionsClient {
    pub fn new(config: &ReasoningConfig) -> Result<Self, ReasoningClientError> {
        if !config.enabled {
            return Err(ReasoningClientError::NotEnabled);
        }
        if config.api_key.is_empty() {
            return Err(ReasoningClientError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.attempt_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_ms: config.attempt_timeout_ms,
        })
    }

    /// Sends one prompt and returns the first choice's message content.
    async fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            truncate_on_char_boundary(&mut text, MAX_ERROR_BODY);
            return Err(ReasoningError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::Malformed(format!("invalid completion body: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ReasoningError::Malformed("completion has no content".into()))?;

        debug!(chars = content.len(), "Reasoning completion received");
        Ok(content)
    }

    fn transport_error(&self, err: reqwest::Error) -> ReasoningError {
        if err.is_timeout() {
            ReasoningError::Timeout(self.timeout_ms)
        } else {
            ReasoningError::Http(err.to_string())
        }
    }
}

fn truncate_on_char_boundary(text: &mut String, max: usize) {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
}

#[async_trait]
impl ReasoningService for ChatCompletionsClient {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ModelClassification, ReasoningError> {
        let content = self.complete(&request.instructions()).await?;
        ModelClassification::parse(&content)
    }

    async fn recommend(
        &self,
        request: &RecommendationRequest<'_>,
    ) -> Result<Value, ReasoningError> {
        let content = self.complete(&request.instructions()).await?;
        extract_json_object(&content)
    }
}
