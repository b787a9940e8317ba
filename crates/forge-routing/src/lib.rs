//! Request classification, model-tier routing and planning.
//!
//! The [`Planner`] turns a free-text component request into a [`forge_core::Plan`]:
//! the [`IntentClassifier`] asks the fast model for a structured classification,
//! the [`TierRouter`] picks a generation tier, and fixed templates supply the
//! step list and token budget.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

/// Intent and complexity classification.
pub mod analyzer;
/// Planning: similar patterns, steps and budgets.
pub mod planner;
/// Model tier selection.
pub mod router;

pub use analyzer::{Classification, ClassificationOutcome, IntentClassifier, parse_classification};
pub use planner::{Planner, PlanningOutcome};
pub use router::{
    ComplexityStrategy, ExploratoryMoodStrategy, RoutingDecision, RoutingInput, RoutingStrategy,
    TierRouter,
};
