//! Per-call timeout wrapper around any provider.

use async_trait::async_trait;
use forge_core::{Error, ModelProvider, ModelRequest, ModelResponse, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Bounds every call of the wrapped provider by a wall-clock timeout.
pub struct TimeoutProvider {
    /// Wrapped provider
    inner: Arc<dyn ModelProvider>,
    /// Budget per call
    limit: Duration,
}

impl TimeoutProvider {
    /// Wraps `inner` with a per-call limit.
    pub fn new(inner: Arc<dyn ModelProvider>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    /// Wraps `inner` with a limit in whole seconds.
    pub fn from_secs(inner: Arc<dyn ModelProvider>, seconds: u64) -> Self {
        Self::new(inner, Duration::from_secs(seconds))
    }
}

#[async_trait]
impl ModelProvider for TimeoutProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse> {
        if let Ok(result) = timeout(self.limit, self.inner.invoke(request)).await {
            result
        } else {
            warn!(
                "{} call to {} timed out after {:?}",
                self.inner.name(),
                request.model_id,
                self.limit
            );
            Err(Error::Timeout(self.limit.as_secs()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;
    use forge_core::{ChatMessage, TokenUsage};
    use tokio::time::sleep;

    struct SlowProvider;

    #[async_trait]
    impl ModelProvider for SlowProvider {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse> {
            sleep(Duration::from_secs(5)).await;
            Ok(ModelResponse {
                content: String::new(),
                usage: TokenUsage::default(),
                model_id: request.model_id.clone(),
                latency_ms: 5000,
            })
        }
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let provider = TimeoutProvider::new(Arc::new(SlowProvider), Duration::from_millis(20));
        let request = ModelRequest::new("any").with_message(ChatMessage::user("hi"));

        let error = provider.invoke(&request).await.unwrap_err();
        assert!(matches!(error, Error::Timeout(_)));
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() -> Result<()> {
        let mock = MockProvider::new().with_response("hi", "hello");
        let provider = TimeoutProvider::from_secs(Arc::new(mock), 5);
        let request = ModelRequest::new("any").with_message(ChatMessage::user("hi"));

        let response = provider.invoke(&request).await?;
        assert_eq!(response.content, "hello");
        assert_eq!(provider.name(), "mock");
        Ok(())
    }
}
