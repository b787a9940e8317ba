//! Integration tests for the `Planner`.
//!
//! Runs classification against a scripted provider and checks the resulting plan.

#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use anyhow::Result;
use forge_core::{
    Complexity, Error, ForgeConfig, Intent, MemoryStore, ModelTier, Mood, PatternRecord,
    PipelineStore as _,
};
use forge_providers::MockProvider;
use forge_routing::Planner;
use std::sync::Arc;

const CLASSIFIER_MARKER: &str = "You classify requests";

fn planner(provider: MockProvider, store: Arc<MemoryStore>) -> Result<Planner> {
    Ok(Planner::new(
        Arc::new(provider),
        store,
        &ForgeConfig::default(),
    )?)
}

#[tokio::test]
async fn test_simple_chart_plan() -> Result<()> {
    let provider = MockProvider::new().with_response(
        CLASSIFIER_MARKER,
        r#"{"intent":"chart","complexity":"simple","key_features":["monthly revenue bars"],
            "suggested_dependencies":["recharts"],"estimated_lines":90}"#,
    );
    let store = Arc::new(MemoryStore::with_defaults());
    store
        .save_pattern(PatternRecord::new("rev", "Revenue chart", Intent::Chart))
        .await?;

    let outcome = planner(provider.clone(), Arc::clone(&store))?
        .classify_and_plan("bar chart of monthly revenue", Mood::Balanced)
        .await?;
    let plan = outcome.plan;

    assert_eq!(plan.intent, Intent::Chart);
    assert_eq!(plan.complexity, Complexity::Simple);
    assert_eq!(plan.tier, ModelTier::Fast);
    assert_eq!(plan.model_id, ForgeConfig::default().models.fast_model);
    assert_eq!(plan.estimated_tokens, 2000);
    assert_eq!(plan.steps.len(), 5);
    assert_eq!(plan.suggested_dependencies, ["recharts"]);
    assert_eq!(plan.estimated_lines, Some(90));
    assert_eq!(plan.similar_patterns.len(), 1);
    assert!(outcome.usage.total() > 0);

    let request = &provider.get_call_history()[0];
    assert!(request.temperature < 0.3);
    assert_eq!(request.model_id, ForgeConfig::default().models.fast_model);
    Ok(())
}

#[tokio::test]
async fn test_exploratory_mood_upgrades_tier() -> Result<()> {
    let provider = MockProvider::new()
        .with_response(CLASSIFIER_MARKER, r#"{"intent":"utility","complexity":"simple"}"#);

    let outcome = planner(provider, Arc::new(MemoryStore::new()))?
        .classify_and_plan("a unit converter", Mood::Exploratory)
        .await?;

    assert_eq!(outcome.plan.tier, ModelTier::Capable);
    assert_eq!(outcome.plan.estimated_tokens, 2000);
    Ok(())
}

#[tokio::test]
async fn test_garbage_classification_uses_default_plan() -> Result<()> {
    let provider =
        MockProvider::new().with_response(CLASSIFIER_MARKER, "I think this is a dashboard!");

    let outcome = planner(provider, Arc::new(MemoryStore::new()))?
        .classify_and_plan("something vague", Mood::Balanced)
        .await?;

    assert_eq!(outcome.plan.intent, Intent::Custom);
    assert_eq!(outcome.plan.complexity, Complexity::Moderate);
    assert_eq!(outcome.plan.tier, ModelTier::Capable);
    assert_eq!(outcome.plan.estimated_tokens, 4000);
    assert!(outcome.plan.key_features.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_classifier_failure_propagates() -> Result<()> {
    let provider = MockProvider::new().with_failure(CLASSIFIER_MARKER, "upstream down");

    let error = planner(provider, Arc::new(MemoryStore::new()))?
        .classify_and_plan("a form", Mood::Balanced)
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Provider(_)));
    Ok(())
}
