//! Model tier routing.
//!
//! Strategies are consulted by priority; the first one that applies picks the
//! tier, and the configured model for that tier serves the generation.

/// Built-in routing strategies.
pub mod strategies;

use core::cmp::Reverse;
use forge_core::{Complexity, ModelConfig, ModelTier, Mood};
use serde::{Deserialize, Serialize};

pub use strategies::{ComplexityStrategy, ExploratoryMoodStrategy};

/// What a routing strategy gets to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingInput {
    /// Classified complexity
    pub complexity: Complexity,
    /// Requested tone
    pub mood: Mood,
}

/// Routing decision with rationale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Selected tier
    pub tier: ModelTier,
    /// Model identifier for the tier
    pub model_id: String,
    /// Strategy that made the decision
    pub reasoning: String,
}

/// A rule for picking the generation tier.
pub trait RoutingStrategy: Send + Sync {
    /// Whether this strategy has an opinion about `input`.
    fn applies_to(&self, input: &RoutingInput) -> bool;

    /// Tier to use when the strategy applies.
    fn select_tier(&self, input: &RoutingInput) -> ModelTier;

    /// Higher priorities are consulted first.
    fn priority(&self) -> u8;

    /// Strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Consults strategies by descending priority; the first that applies wins.
pub struct TierRouter {
    strategies: Vec<Box<dyn RoutingStrategy>>,
    models: ModelConfig,
}

impl TierRouter {
    /// Router with the standard strategies.
    #[must_use]
    pub fn new(models: ModelConfig) -> Self {
        Self::with_strategies(
            models,
            vec![
                Box::new(ExploratoryMoodStrategy),
                Box::new(ComplexityStrategy),
            ],
        )
    }

    /// Router with custom strategies.
    #[must_use]
    pub fn with_strategies(
        models: ModelConfig,
        mut strategies: Vec<Box<dyn RoutingStrategy>>,
    ) -> Self {
        strategies.sort_by_key(|strategy| Reverse(strategy.priority()));
        Self { strategies, models }
    }

    /// Picks the tier for a classified request.
    ///
    /// Falls back to the capable tier when no strategy applies.
    #[must_use]
    pub fn route(&self, input: &RoutingInput) -> RoutingDecision {
        let (tier, reasoning) = self
            .strategies
            .iter()
            .find(|strategy| strategy.applies_to(input))
            .map_or((ModelTier::Capable, "default"), |strategy| {
                (strategy.select_tier(input), strategy.name())
            });

        RoutingDecision {
            tier,
            model_id: self.models.model_for(tier).to_owned(),
            reasoning: reasoning.to_owned(),
        }
    }
}
