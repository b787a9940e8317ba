//! Built-in tier selection strategies.

use super::{RoutingInput, RoutingStrategy};
use forge_core::{Complexity, ModelTier, Mood};

/// Exploratory requests always get the most capable model.
pub struct ExploratoryMoodStrategy;

impl RoutingStrategy for ExploratoryMoodStrategy {
    fn applies_to(&self, input: &RoutingInput) -> bool {
        input.mood == Mood::Exploratory
    }

    fn select_tier(&self, _input: &RoutingInput) -> ModelTier {
        ModelTier::Capable
    }

    fn priority(&self) -> u8 {
        100
    }

    fn name(&self) -> &'static str {
        "ExploratoryMood"
    }
}

/// Only simple requests go to the fast tier.
pub struct ComplexityStrategy;

impl RoutingStrategy for ComplexityStrategy {
    fn applies_to(&self, _input: &RoutingInput) -> bool {
        true
    }

    fn select_tier(&self, input: &RoutingInput) -> ModelTier {
        match input.complexity {
            Complexity::Simple => ModelTier::Fast,
            Complexity::Moderate | Complexity::Complex => ModelTier::Capable,
        }
    }

    fn priority(&self) -> u8 {
        50
    }

    fn name(&self) -> &'static str {
        "Complexity"
    }
}
