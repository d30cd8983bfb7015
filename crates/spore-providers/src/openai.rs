//! OpenAI-compatible chat completions provider.
//!
//! Works with OpenAI's API and any endpoint that speaks `/chat/completions`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spore_core::{
    config::OpenAiConfig,
    context::{ApiMessage, Context},
    error::SporeError,
    message::{MessageMetadata, OutgoingMessage},
    traits::Provider,
};
use std::time::Instant;
use tracing::{debug, warn};

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    /// Create from config values.
    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<ApiMessage> for ChatMessage {
    fn from(m: ApiMessage) -> Self {
        Self {
            role: m.role,
            content: m.content,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
    pub model: Option<String>,
    pub usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
pub(crate) struct ResponseMessage {
    /// Null when the model refuses or returns only tool calls.
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ChatUsage {
    pub total_tokens: Option<u64>,
}

/// Build the request body for a context.
pub(crate) fn build_request(model: &str, context: &Context) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: context.model.clone().unwrap_or_else(|| model.to_string()),
        messages: context
            .to_api_messages()
            .into_iter()
            .map(ChatMessage::from)
            .collect(),
        max_tokens: context.max_tokens,
        temperature: context.temperature,
    }
}

/// First non-empty choice text, trimmed.
pub(crate) fn extract_text(parsed: &ChatCompletionResponse) -> Option<String> {
    parsed
        .choices
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.message.as_ref())
        .and_then(|m| m.content.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, SporeError> {
        let start = Instant::now();
        let body = build_request(&self.model, context);

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("openai: POST {url} model={}", body.model);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SporeError::Provider(format!("openai request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SporeError::Provider(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| SporeError::Provider(format!("openai: failed to parse response: {e}")))?;

        let text = extract_text(&parsed)
            .ok_or_else(|| SporeError::Provider("openai returned no content".into()))?;

        Ok(OutgoingMessage {
            text,
            metadata: MessageMetadata {
                provider_used: "openai".to_string(),
                tokens_used: parsed.usage.as_ref().and_then(|u| u.total_tokens),
                processing_time_ms: start.elapsed().as_millis() as u64,
                model: parsed.model,
            },
            ..Default::default()
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {e}");
                false
            }
        }
    }
}
