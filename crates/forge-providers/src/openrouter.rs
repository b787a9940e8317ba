//! `OpenRouter` chat-completions provider.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use forge_core::{
    ChatMessage, Error, ForgeConfig, ModelProvider, ModelRequest, ModelResponse, Result,
    TokenUsage,
};

/// `OpenRouter` API endpoint URL.
const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
/// Env var key for `OpenRouter` API key.
const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";

/// Provider implementation for the `OpenRouter` chat-completions API.
///
/// The model is chosen per request from [`ModelRequest::model_id`].
pub struct OpenRouterProvider {
    /// HTTP client for API requests.
    client: Client,
    /// `OpenRouter` API key.
    api_key: String,
}

impl OpenRouterProvider {
    /// Creates a new `OpenRouterProvider` with the given API key.
    ///
    /// # Errors
    /// Returns an error if the provided API key is empty.
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::MissingApiKey(ENV_OPENROUTER_API_KEY.to_owned()));
        }

        Ok(Self {
            client: Client::default(),
            api_key,
        })
    }

    /// Creates a provider from the config file key or the environment.
    ///
    /// # Errors
    /// Returns an error if no API key is available.
    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        let api_key = config.openrouter_api_key().ok_or_else(|| {
            Error::MissingApiKey(format!(
                "{ENV_OPENROUTER_API_KEY} or config.toml openrouter_api_key"
            ))
        })?;
        Self::new(api_key)
    }

    /// Converts pipeline messages to the wire format.
    fn build_messages(messages: &[ChatMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|message| {
                json!({
                    "role": message.role.to_string(),
                    "content": message.content,
                })
            })
            .collect()
    }
}

/// Response payload returned by the `OpenRouter` API.
#[derive(Deserialize)]
struct OpenRouterResponse {
    /// List of generated choices.
    choices: Vec<Choice>,
    /// Optional token usage statistics returned by the service.
    usage: Option<Usage>,
}

/// Individual completion choice from `OpenRouter`.
#[derive(Deserialize)]
struct Choice {
    /// Message payload representing the completion text.
    message: Message,
}

/// Message structure containing generated content.
#[derive(Deserialize)]
struct Message {
    /// Text content produced by the model.
    content: String,
}

/// Token accounting information for a response.
#[derive(Deserialize)]
struct Usage {
    /// Number of prompt tokens billed for the request.
    prompt_tokens: u64,
    /// Number of completion tokens returned by the model.
    completion_tokens: u64,
}

#[async_trait]
impl ModelProvider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let start = Instant::now();

        let request_body = json!({
            "model": request.model_id,
            "messages": Self::build_messages(&request.messages),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        debug!(
            "OpenRouter request: model={} messages={} max_tokens={}",
            request.model_id,
            request.messages.len(),
            request.max_tokens
        );

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "Forge")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "OpenRouter API request failed with status {status}: {error_text}"
            )));
        }

        let api_response: OpenRouterResponse = response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("Failed to parse response: {err}")))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::InvalidResponse("No choices in OpenRouter response".to_owned()))?;

        let usage = api_response
            .usage
            .map(|usage| TokenUsage {
                input: usage.prompt_tokens,
                output: usage.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ModelResponse {
            content,
            usage,
            model_id: request.model_id.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
