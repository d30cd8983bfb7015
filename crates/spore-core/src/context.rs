use serde::{Deserialize, Serialize};

/// A single completion request passed to an AI provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// System prompt sent ahead of the user message.
    pub system_prompt: String,
    /// The user message.
    pub current_message: String,
    /// Upper bound on generated tokens. `None` uses the provider default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature. `None` uses the provider default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Override the provider's configured model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A structured message for API-based providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    /// The message content.
    pub content: String,
}

impl Context {
    /// Create a context with a system prompt and a user message.
    pub fn new(system_prompt: &str, message: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            current_message: message.to_string(),
            max_tokens: None,
            temperature: None,
            model: None,
        }
    }

    /// Bound the output length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Convert the context to chat-style API messages, system first.
    ///
    /// An empty system prompt is omitted.
    pub fn to_api_messages(&self) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            messages.push(ApiMessage {
                role: "system".to_string(),
                content: self.system_prompt.clone(),
            });
        }
        messages.push(ApiMessage {
            role: "user".to_string(),
            content: self.current_message.clone(),
        });
        messages
    }
}
