//! Planning: turns a request into steps, a budget and a model choice.
//!
//! Classification, similar-pattern lookup and tier routing run in that order;
//! only the classifier talks to a model.

/// Similar-pattern lookup.
pub mod patterns;
/// Step templates and token budgets.
pub mod templates;

use crate::analyzer::IntentClassifier;
use crate::router::{RoutingInput, TierRouter};
use forge_core::{
    ForgeConfig, ModelProvider, ModelTier, Mood, PipelineStore, Plan, Result, TokenUsage,
};
use std::sync::Arc;
use tracing::info;

pub use patterns::find_similar_patterns;
pub use templates::{steps_for, token_budget};

/// Planner output plus what it cost to produce.
#[derive(Debug, Clone)]
pub struct PlanningOutcome {
    /// The plan
    pub plan: Plan,
    /// Tokens spent on classification
    pub usage: TokenUsage,
    /// Estimated cost of classification in USD
    pub cost: f64,
}

/// Turns a request into a [`Plan`].
pub struct Planner {
    classifier: IntentClassifier,
    router: TierRouter,
    store: Arc<dyn PipelineStore>,
}

impl Planner {
    /// Creates a planner with the standard classifier and router.
    ///
    /// # Errors
    /// Returns an error if the classification prompt cannot be loaded.
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        store: Arc<dyn PipelineStore>,
        config: &ForgeConfig,
    ) -> Result<Self> {
        Ok(Self::with_parts(
            IntentClassifier::new(provider, config)?,
            TierRouter::new(config.models.clone()),
            store,
        ))
    }

    /// Creates a planner from explicit parts.
    pub fn with_parts(
        classifier: IntentClassifier,
        router: TierRouter,
        store: Arc<dyn PipelineStore>,
    ) -> Self {
        Self {
            classifier,
            router,
            store,
        }
    }

    /// Classifies `prompt` and builds the plan for it.
    ///
    /// # Errors
    /// Returns an error if the classification call or the pattern lookup fails.
    pub async fn classify_and_plan(&self, prompt: &str, mood: Mood) -> Result<PlanningOutcome> {
        let outcome = self.classifier.classify(prompt).await?;
        let classification = outcome.classification;

        let similar_patterns =
            find_similar_patterns(self.store.as_ref(), classification.intent).await?;

        let decision = self.router.route(&RoutingInput {
            complexity: classification.complexity,
            mood,
        });

        info!(
            "Planned {} ({}) on {} tier via {}",
            classification.intent, classification.complexity, decision.tier, decision.reasoning
        );

        let plan = Plan {
            intent: classification.intent,
            complexity: classification.complexity,
            steps: steps_for(classification.intent, classification.complexity),
            estimated_tokens: token_budget(classification.complexity),
            tier: decision.tier,
            model_id: decision.model_id,
            similar_patterns,
            suggested_dependencies: classification.suggested_dependencies,
            key_features: classification.key_features,
            estimated_lines: classification.estimated_lines,
        };

        Ok(PlanningOutcome {
            plan,
            usage: outcome.usage,
            cost: ModelTier::Fast.estimate_cost(outcome.usage.total()),
        })
    }
}
