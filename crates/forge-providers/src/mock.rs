//! Mock provider for testing pipeline runs.
//!
//! Replies are scripted per pattern: the first registered pattern found in the
//! request text answers it. A pattern can carry a sequence of replies which are
//! consumed in order; the last one repeats forever.

use async_trait::async_trait;
use forge_core::{
    Error, IgnoreLock as _, ModelProvider, ModelRequest, ModelResponse, Result, TokenUsage,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Model returns this text
    Text(String),
    /// Model call fails with a provider error
    Failure(String),
}

/// Pattern and its remaining replies.
#[derive(Debug)]
struct Script {
    /// Substring that selects this script
    pattern: String,
    /// Replies still to be served; never empty
    replies: VecDeque<MockReply>,
}

/// Mock provider that returns pre-defined replies based on request patterns.
#[derive(Clone, Default)]
pub struct MockProvider {
    /// Scripts in registration order
    scripts: Arc<Mutex<Vec<Script>>>,
    /// Reply when no pattern matches
    default_response: Arc<Mutex<Option<String>>>,
    /// Every request received
    call_history: Arc<Mutex<Vec<ModelRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests containing `pattern` with `response`.
    #[must_use]
    pub fn with_response(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.with_replies(pattern, vec![MockReply::Text(response.into())])
    }

    /// Answer successive requests containing `pattern` with `responses` in order.
    #[must_use]
    pub fn with_sequence<I, S>(self, pattern: impl Into<String>, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replies = responses
            .into_iter()
            .map(|response| MockReply::Text(response.into()))
            .collect();
        self.with_replies(pattern, replies)
    }

    /// Fail every request containing `pattern`.
    #[must_use]
    pub fn with_failure(self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.with_replies(pattern, vec![MockReply::Failure(message.into())])
    }

    /// Answer successive requests containing `pattern` with arbitrary replies.
    #[must_use]
    pub fn with_replies(self, pattern: impl Into<String>, replies: Vec<MockReply>) -> Self {
        if !replies.is_empty() {
            let mut scripts = self.scripts.lock_ignore_poison();
            scripts.push(Script {
                pattern: pattern.into(),
                replies: replies.into(),
            });
        }
        self
    }

    /// Set a default response for requests that don't match any pattern.
    #[must_use]
    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        {
            let mut default = self.default_response.lock_ignore_poison();
            *default = Some(response.into());
        }
        self
    }

    /// Clear the call history.
    pub fn clear_history(&self) {
        let mut history = self.call_history.lock_ignore_poison();
        history.clear();
    }

    /// Get the call history.
    #[must_use]
    pub fn get_call_history(&self) -> Vec<ModelRequest> {
        let history = self.call_history.lock_ignore_poison();
        history.clone()
    }

    /// Get the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        let history = self.call_history.lock_ignore_poison();
        history.len()
    }

    /// Number of calls whose text contained `pattern`.
    #[must_use]
    pub fn calls_matching(&self, pattern: &str) -> usize {
        let history = self.call_history.lock_ignore_poison();
        history
            .iter()
            .filter(|request| request.full_text().contains(pattern))
            .count()
    }

    /// Take the next reply of the first script matching `text`.
    fn next_reply(&self, text: &str) -> Option<MockReply> {
        let mut scripts = self.scripts.lock_ignore_poison();
        let script = scripts
            .iter_mut()
            .find(|script| text.contains(&script.pattern))?;

        if script.replies.len() > 1 {
            script.replies.pop_front()
        } else {
            script.replies.front().cloned()
        }
    }
}

/// Rough token estimate used for mock accounting.
fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / 4) as u64
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let text = request.full_text();
        {
            let mut history = self.call_history.lock_ignore_poison();
            history.push(request.clone());
        }

        let content = match self.next_reply(&text) {
            Some(MockReply::Text(content)) => content,
            Some(MockReply::Failure(message)) => return Err(Error::Provider(message)),
            None => {
                let default = self.default_response.lock_ignore_poison();
                default
                    .clone()
                    .unwrap_or_else(|| format!("Mock response for: {text}"))
            }
        };

        Ok(ModelResponse {
            usage: TokenUsage {
                input: estimate_tokens(&text),
                output: estimate_tokens(&content),
            },
            content,
            model_id: request.model_id.clone(),
            latency_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::ChatMessage;

    fn request(text: &str) -> ModelRequest {
        ModelRequest::new("mock-model").with_message(ChatMessage::user(text))
    }

    #[tokio::test]
    async fn test_mock_provider_substring_match() -> Result<()> {
        let provider = MockProvider::new().with_response("calculator", "const Calc = 1;");

        let response = provider.invoke(&request("build a calculator please")).await?;
        assert_eq!(response.content, "const Calc = 1;");
        assert_eq!(response.model_id, "mock-model");
        Ok(())
    }

    #[tokio::test]
    async fn test_mock_provider_sequence_repeats_last() -> Result<()> {
        let provider = MockProvider::new().with_sequence("fix", ["first", "second"]);

        assert_eq!(provider.invoke(&request("fix it")).await?.content, "first");
        assert_eq!(provider.invoke(&request("fix it")).await?.content, "second");
        assert_eq!(provider.invoke(&request("fix it")).await?.content, "second");
        Ok(())
    }

    #[tokio::test]
    async fn test_mock_provider_failure() {
        let provider = MockProvider::new().with_failure("boom", "rate limited");

        let error = provider.invoke(&request("boom")).await.unwrap_err();
        assert!(matches!(error, Error::Provider(message) if message == "rate limited"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_provider_default_response() -> Result<()> {
        let provider = MockProvider::new().with_default_response("Default response");

        let response = provider.invoke(&request("unmatched")).await?;
        assert_eq!(response.content, "Default response");
        Ok(())
    }

    #[tokio::test]
    async fn test_mock_provider_call_history() -> Result<()> {
        let provider = MockProvider::new()
            .with_response("first", "a")
            .with_response("second", "b");

        provider.invoke(&request("first query")).await?;
        provider.invoke(&request("second query")).await?;

        let history = provider.get_call_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].full_text(), "first query");
        assert_eq!(provider.calls_matching("second"), 1);

        provider.clear_history();
        assert_eq!(provider.call_count(), 0);
        Ok(())
    }
}
