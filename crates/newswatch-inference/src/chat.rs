//! OpenAI-compatible chat completion backend.
//!
//! One implementation covers both providers: OpenAI and Zhipu expose
//! the same `/chat/completions` shape, differing only in base URL and
//! model names.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use newswatch_core::{defaults, ChatBackend, Error, Result};

/// Configuration for an OpenAI-compatible chat backend.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model to use for chat completions.
    pub model: String,
    /// Provider identifier ("zhipu", "openai").
    pub provider: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl ChatConfig {
    /// Config for the Zhipu endpoint with the given key and model.
    pub fn zhipu(api_key: String, model: String) -> Self {
        Self {
            base_url: defaults::ZHIPU_BASE_URL.to_string(),
            api_key,
            model,
            provider: "zhipu".to_string(),
            temperature: defaults::CHAT_TEMPERATURE,
            timeout_seconds: defaults::CHAT_TIMEOUT_SECS,
        }
    }

    /// Config for the OpenAI endpoint with the given key and model.
    pub fn openai(api_key: String, model: String) -> Self {
        Self {
            base_url: defaults::OPENAI_BASE_URL.to_string(),
            api_key,
            model,
            provider: "openai".to_string(),
            temperature: defaults::CHAT_TEMPERATURE,
            timeout_seconds: defaults::CHAT_TIMEOUT_SECS,
        }
    }

    /// Override the base URL (tests point this at a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Chat backend speaking the OpenAI `/chat/completions` protocol.
pub struct OpenAiChatBackend {
    client: Client,
    config: ChatConfig,
}

impl OpenAiChatBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {e}")))?;

        info!(
            subsystem = "inference",
            component = "chat",
            provider = %config.provider,
            model = %config.model,
            "Initializing chat backend"
        );

        Ok(Self { client, config })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatBackend {
    async fn chat(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: self.config.temperature,
        };

        debug!(
            subsystem = "inference",
            component = "chat",
            op = "chat",
            provider = %self.config.provider,
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending chat completion request"
        );

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            // The status code stays in the message so stored errors can
            // be re-classified as rate-limited after the fact.
            return Err(Error::Inference(format!(
                "chat completion HTTP {}: {}",
                status.as_u16(),
                snippet
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Invalid chat response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(Error::Inference("Empty chat completion".to_string()));
        }

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn provider_name(&self) -> &str {
        &self.config.provider
    }
}
