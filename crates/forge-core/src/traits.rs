//! Collaborator trait for model providers.

use async_trait::async_trait;

use crate::{ModelRequest, ModelResponse, Result};

/// Trait for generation-model providers.
///
/// The pipeline treats a provider as a pure async function; connection pooling,
/// authentication and timeouts belong to the implementation.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Returns the unique identifier for this provider.
    fn name(&self) -> &'static str;

    /// Invokes the model with the given request.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unavailable, the request fails,
    /// or the response cannot be parsed.
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse>;
}
