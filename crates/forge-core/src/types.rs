//! Model request and response types shared by every provider.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the whole exchange
    System,
    /// End-user or pipeline supplied content
    User,
    /// Model output
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message sent to the generation model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single generation-model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Provider-specific model identifier
    pub model_id: String,
    /// Conversation sent to the model
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl ModelRequest {
    /// Creates a request with the default sampling settings.
    pub fn new<T: Into<String>>(model_id: T) -> Self {
        Self {
            model_id: model_id.into(),
            messages: Vec::new(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }

    /// Appends a message.
    #[must_use]
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the generated-token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Concatenates every message body, used for matching and token estimates.
    #[must_use]
    pub fn full_text(&self) -> String {
        self.messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Output of a generation-model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Raw text returned by the model
    pub content: String,
    /// Token accounting for this call
    pub usage: TokenUsage,
    /// Model that served the request
    pub model_id: String,
    /// Wall-clock latency of the call
    pub latency_ms: u64,
}

/// Token accounting for one or more model calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input: u64,
    /// Completion tokens
    pub output: u64,
}

impl TokenUsage {
    /// Total tokens consumed.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input + self.output
    }

    /// Adds another usage record to this one.
    pub fn add(&mut self, other: Self) {
        self.input += other.input;
        self.output += other.output;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = ModelRequest::new("fast")
            .with_message(ChatMessage::system("rules"))
            .with_message(ChatMessage::user("build a calculator"))
            .with_temperature(0.3)
            .with_max_tokens(2000);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.max_tokens, 2000);
        assert_eq!(request.full_text(), "rules\nbuild a calculator");
    }

    #[test]
    fn test_token_usage_accumulates() {
        let mut usage = TokenUsage::default();
        usage.add(TokenUsage {
            input: 10,
            output: 5,
        });
        usage.add(TokenUsage {
            input: 1,
            output: 2,
        });
        assert_eq!(usage.total(), 18);
    }
}
