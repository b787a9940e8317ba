//! Planner output: intent, complexity, model tier and pattern references.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Closed set of component categories the planner classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Arithmetic or conversion calculators
    Calculator,
    /// Charts and graphs
    Chart,
    /// Input forms
    Form,
    /// Tabular data views
    Table,
    /// Multi-widget dashboards
    Dashboard,
    /// Small interactive games
    Game,
    /// Non-chart visualizations
    Visualization,
    /// Single-purpose tools
    Utility,
    /// Anything else
    Custom,
}

impl Intent {
    /// Every intent, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Calculator,
        Self::Chart,
        Self::Form,
        Self::Table,
        Self::Dashboard,
        Self::Game,
        Self::Visualization,
        Self::Utility,
        Self::Custom,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calculator => "calculator",
            Self::Chart => "chart",
            Self::Form => "form",
            Self::Table => "table",
            Self::Dashboard => "dashboard",
            Self::Game => "game",
            Self::Visualization => "visualization",
            Self::Utility => "utility",
            Self::Custom => "custom",
        }
    }

    /// Parses a model-supplied name; unknown names map to `Custom`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == normalized)
            .unwrap_or(Self::Custom)
    }
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// How much work the request looks like.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Single widget, little state
    Simple,
    /// A handful of interacting parts
    #[default]
    Moderate,
    /// Component hierarchy with shared state
    Complex,
}

impl Complexity {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }

    /// Parses a model-supplied name; unknown names map to `Moderate`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "simple" => Self::Simple,
            "complex" => Self::Complex,
            _ => Self::Moderate,
        }
    }
}

impl Display for Complexity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Generation model tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheapest, fastest model
    Fast,
    /// Highest-capability model
    Capable,
}

impl ModelTier {
    /// Rough blended cost in USD per million tokens.
    #[must_use]
    pub const fn cost_per_million_tokens(self) -> f64 {
        match self {
            Self::Fast => 1.0,
            Self::Capable => 15.0,
        }
    }

    /// Estimated cost of `tokens` tokens on this tier.
    #[must_use]
    pub fn estimate_cost(self, tokens: u64) -> f64 {
        (tokens as f64 / 1_000_000.0) * self.cost_per_million_tokens()
    }
}

impl Display for ModelTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Capable => write!(f, "capable"),
        }
    }
}

/// Ranked reference to a previously stored pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReference {
    /// Pattern identifier
    pub id: String,
    /// Similarity score (0.0-1.0)
    pub similarity: f64,
    /// Pattern display name
    pub name: String,
}

/// Planner output; read-only once attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Component category
    pub intent: Intent,
    /// Complexity tier
    pub complexity: Complexity,
    /// Ordered human-readable steps
    pub steps: Vec<String>,
    /// Token budget for generation
    pub estimated_tokens: u32,
    /// Selected tier
    pub tier: ModelTier,
    /// Provider model identifier for the selected tier
    pub model_id: String,
    /// Up to three similar prior patterns, best first
    pub similar_patterns: Vec<PatternReference>,
    /// Packages the classifier suggested
    pub suggested_dependencies: Vec<String>,
    /// Features the classifier extracted
    pub key_features: Vec<String>,
    /// Classifier's line-count estimate
    pub estimated_lines: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_labels() {
        assert_eq!(Intent::from_label("Chart"), Intent::Chart);
        assert_eq!(Intent::from_label(" dashboard "), Intent::Dashboard);
        assert_eq!(Intent::from_label("spreadsheet"), Intent::Custom);
    }

    #[test]
    fn test_complexity_labels() {
        assert_eq!(Complexity::from_label("SIMPLE"), Complexity::Simple);
        assert_eq!(Complexity::from_label("complex"), Complexity::Complex);
        assert_eq!(Complexity::from_label("huge"), Complexity::Moderate);
    }

    #[test]
    fn test_cost_estimate() {
        let cost = ModelTier::Capable.estimate_cost(1_000_000);
        assert!((cost - 15.0).abs() < f64::EPSILON);
        assert!(ModelTier::Fast.estimate_cost(1000) < ModelTier::Capable.estimate_cost(1000));
    }
}
