//! Component generation.
//!
//! The generator renders the constraint-heavy system prompt, calls the model
//! once and extracts the component from the reply. Streaming re-segments the
//! finished artifact; the model is never streamed.

/// Stream chunks over a finished artifact.
pub mod chunks;
/// Code extraction from model replies.
pub mod extract;

use forge_core::prompts::{load_prompt, render};
use forge_core::{
    ChatMessage, ForgeConfig, GenerationRequest, ModelProvider, ModelRequest, PipelineConfig,
    PipelineStore, Plan, Result, Session, TokenUsage,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use chunks::{ChunkStream, CodeChunk};
pub use extract::{extract_code, leading_prose};

/// Output of one generation call.
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    /// Extracted component source
    pub code: String,
    /// Full model reply
    pub raw: String,
    /// Tokens spent
    pub usage: TokenUsage,
    /// Model that served the call
    pub model_id: String,
    /// Estimated cost in USD
    pub cost: f64,
}

/// Produces a component for a planned session.
pub struct Generator {
    provider: Arc<dyn ModelProvider>,
    store: Arc<dyn PipelineStore>,
    template: String,
    pipeline: PipelineConfig,
    max_lines: usize,
}

impl Generator {
    /// Creates a generator.
    ///
    /// # Errors
    /// Returns an error if the embedded generation prompt cannot be loaded.
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        store: Arc<dyn PipelineStore>,
        config: &ForgeConfig,
    ) -> Result<Self> {
        Ok(Self {
            provider,
            store,
            template: load_prompt("generation")?,
            pipeline: config.pipeline.clone(),
            max_lines: config.validation.max_lines,
        })
    }

    /// Generates the full artifact with a single model call.
    ///
    /// # Errors
    /// Returns an error if the allowlist cannot be read or the model call fails.
    pub async fn generate_complete(
        &self,
        session: &Session,
        plan: &Plan,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact> {
        let system_prompt = self.system_prompt(session, plan).await?;

        let model_request = ModelRequest::new(plan.model_id.clone())
            .with_message(ChatMessage::system(system_prompt))
            .with_message(ChatMessage::user(request.prompt.clone()))
            .with_temperature(self.pipeline.generation_temperature)
            .with_max_tokens(plan.estimated_tokens);

        let response = self.provider.invoke(&model_request).await?;
        let code = extract_code(&response.content);
        info!(
            "Generated {} lines for session {} with {}",
            code.lines().count(),
            session.id,
            response.model_id
        );

        Ok(GeneratedArtifact {
            code,
            cost: plan.tier.estimate_cost(response.usage.total()),
            raw: response.content,
            usage: response.usage,
            model_id: response.model_id,
        })
    }

    /// Generates the artifact and returns it as a chunk stream.
    ///
    /// # Errors
    /// Same as [`Self::generate_complete`].
    pub async fn generate_with_streaming(
        &self,
        session: &Session,
        plan: &Plan,
        request: &GenerationRequest,
    ) -> Result<ChunkStream> {
        let artifact = self.generate_complete(session, plan, request).await?;
        Ok(ChunkStream::new(artifact, self.pipeline.chunk_size))
    }

    async fn system_prompt(&self, session: &Session, plan: &Plan) -> Result<String> {
        let allowlist = self.store.allowlist(&session.tenant_id).await?;
        let max_lines = self.max_lines.to_string();
        let steps = numbered(&plan.steps);
        let features = if plan.key_features.is_empty() {
            "- Whatever the request describes".to_owned()
        } else {
            bulleted(&plan.key_features)
        };

        let mut prompt = render(
            &self.template,
            &[
                ("allowed_imports", &allowlist.join(", ")),
                ("max_lines", &max_lines),
                ("intent", plan.intent.as_str()),
                ("complexity", plan.complexity.as_str()),
                ("steps", &steps),
                ("features", &features),
            ],
        );

        if let Some(snippet) = self.reference_snippet(plan).await {
            prompt.push_str("\n\nReference component for style guidance only:\n```tsx\n");
            prompt.push_str(&snippet);
            prompt.push_str("\n```");
        }
        Ok(prompt)
    }

    /// Code of the first referenced pattern that has any, truncated to the snippet budget.
    async fn reference_snippet(&self, plan: &Plan) -> Option<String> {
        for reference in &plan.similar_patterns {
            let pattern = match self.store.get_pattern(&reference.id).await {
                Ok(Some(pattern)) => pattern,
                Ok(None) => continue,
                Err(err) => {
                    warn!("Failed to load reference pattern {}: {err}", reference.id);
                    continue;
                }
            };
            if let Some(code) = pattern.code {
                debug!("Using pattern {} as reference", reference.id);
                return Some(code.chars().take(self.pipeline.reference_snippet_chars).collect());
            }
        }
        None
    }
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| format!("{}. {item}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bulleted(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
