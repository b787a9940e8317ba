//! Bounded self-repair of artifacts that failed validation, and escalation
//! to human review once the attempt budget is spent.

use crate::generator::{extract_code, leading_prose};
use chrono::Utc;
use forge_core::prompts::{load_prompt, render};
use forge_core::{
    ChatMessage, ForgeConfig, HumanReviewRecord, ModelProvider, ModelRequest, ModelTier,
    PipelineStore, Result, Session, TokenUsage, ValidationVerdict,
};
use std::sync::Arc;
use tracing::{info, warn};

/// A repair that did not produce valid code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousAttempt {
    /// Code the attempt produced
    pub code: String,
    /// Block messages it failed with
    pub errors: Vec<String>,
}

/// Input for one repair attempt.
#[derive(Debug, Clone)]
pub struct ReflexionContext {
    /// Code that failed validation
    pub code: String,
    /// Block messages from the failed validation
    pub errors: Vec<String>,
    /// 1-based number of this attempt
    pub attempt: u32,
    /// Attempt ceiling
    pub max_attempts: u32,
    /// Earlier attempts that also failed
    pub previous_attempts: Vec<PreviousAttempt>,
}

/// Result of one repair attempt.
#[derive(Debug, Clone)]
pub struct ReflexionOutcome {
    /// Whether the model returned usable code
    pub success: bool,
    /// Repaired code, or the original code on failure
    pub fixed_code: String,
    /// What the model said it changed
    pub explanation: String,
    /// Tokens spent
    pub usage: TokenUsage,
    /// Estimated cost in USD
    pub cost: f64,
}

impl ReflexionOutcome {
    fn failed(context: &ReflexionContext, explanation: String) -> Self {
        Self {
            success: false,
            fixed_code: context.code.clone(),
            explanation,
            usage: TokenUsage::default(),
            cost: 0.0,
        }
    }
}

/// Whether the attempt budget is spent.
pub const fn should_escalate(attempt: u32, max_attempts: u32) -> bool {
    attempt >= max_attempts
}

/// Repairs failing artifacts with targeted model calls.
pub struct Reflexion {
    provider: Arc<dyn ModelProvider>,
    store: Arc<dyn PipelineStore>,
    template: String,
    temperature: f32,
    fallback_model: String,
}

impl Reflexion {
    /// Creates a reflexion engine.
    ///
    /// # Errors
    /// Returns an error if the embedded reflexion prompt cannot be loaded.
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        store: Arc<dyn PipelineStore>,
        config: &ForgeConfig,
    ) -> Result<Self> {
        Ok(Self {
            provider,
            store,
            template: load_prompt("reflexion")?,
            temperature: config.pipeline.repair_temperature,
            fallback_model: config.models.capable_model.clone(),
        })
    }

    /// Asks the model to fix the errors in `context.code`.
    ///
    /// On success the session's attempt counter is incremented. A failed call
    /// or an empty reply returns the original code with `success = false`.
    pub async fn attempt_fix(
        &self,
        context: &ReflexionContext,
        session: &mut Session,
    ) -> ReflexionOutcome {
        let (model_id, tier, max_tokens) = session.plan.as_ref().map_or_else(
            || (self.fallback_model.clone(), ModelTier::Capable, 8000),
            |plan| (plan.model_id.clone(), plan.tier, plan.estimated_tokens),
        );

        let request = ModelRequest::new(model_id)
            .with_message(ChatMessage::system(self.render_prompt(context)))
            .with_temperature(self.temperature)
            .with_max_tokens(max_tokens);

        let response = match self.provider.invoke(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "Repair attempt {} for session {} failed: {err}",
                    context.attempt, session.id
                );
                return ReflexionOutcome::failed(context, err.to_string());
            }
        };

        let cost = tier.estimate_cost(response.usage.total());
        let fixed_code = extract_code(&response.content);
        if fixed_code.is_empty() {
            warn!("Repair attempt {} returned no code", context.attempt);
            return ReflexionOutcome {
                usage: response.usage,
                cost,
                ..ReflexionOutcome::failed(context, "Model returned no code".to_owned())
            };
        }

        if !session.record_reflexion_attempt() {
            warn!("Session {} has no repair attempts left", session.id);
            return ReflexionOutcome {
                usage: response.usage,
                cost,
                ..ReflexionOutcome::failed(context, "Attempt budget exhausted".to_owned())
            };
        }

        info!(
            "Repair attempt {}/{} produced {} lines",
            context.attempt,
            context.max_attempts,
            fixed_code.lines().count()
        );
        ReflexionOutcome {
            success: true,
            explanation: leading_prose(&response.content).to_owned(),
            fixed_code,
            usage: response.usage,
            cost,
        }
    }

    /// Files a human-review record for an exhausted session.
    ///
    /// Returns whether the record was stored; storage failures are only traced.
    pub async fn escalate(&self, session: &Session, verdict: &ValidationVerdict) -> bool {
        let record = HumanReviewRecord {
            session_id: session.id,
            tenant_id: session.tenant_id.clone(),
            reason: verdict.failed_rules.join(", "),
            recovery_attempts: session.reflexion_attempts(),
            final_code: session.final_code().map(str::to_owned),
            created_at: Utc::now(),
        };

        match self.store.create_review(record).await {
            Ok(()) => {
                info!("Escalated session {} to human review", session.id);
                true
            }
            Err(err) => {
                warn!("Failed to escalate session {}: {err}", session.id);
                false
            }
        }
    }

    fn render_prompt(&self, context: &ReflexionContext) -> String {
        let errors = context
            .errors
            .iter()
            .map(|error| format!("- {error}"))
            .collect::<Vec<_>>()
            .join("\n");

        let previous = if context.previous_attempts.is_empty() {
            "None".to_owned()
        } else {
            context
                .previous_attempts
                .iter()
                .enumerate()
                .map(|(index, attempt)| {
                    format!("Attempt {}: {}", index + 1, attempt.errors.join("; "))
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        render(
            &self.template,
            &[
                ("attempt", &context.attempt.to_string()),
                ("max_attempts", &context.max_attempts.to_string()),
                ("errors", &errors),
                ("previous_attempts", &previous),
                ("code", &context.code),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::{GenerationRequest, MemoryStore};
    use forge_providers::MockProvider;

    const REPAIR_MARKER: &str = "failed automated policy validation";

    fn context() -> ReflexionContext {
        ReflexionContext {
            code: "const a = eval('1');".to_owned(),
            errors: vec!["eval() is not allowed".to_owned()],
            attempt: 2,
            max_attempts: 3,
            previous_attempts: vec![PreviousAttempt {
                code: "eval('2')".to_owned(),
                errors: vec!["eval() is not allowed".to_owned()],
            }],
        }
    }

    fn reflexion(provider: &MockProvider, store: Arc<MemoryStore>) -> Reflexion {
        Reflexion::new(Arc::new(provider.clone()), store, &ForgeConfig::default()).unwrap()
    }

    fn session() -> Session {
        Session::new(&GenerationRequest::new("acme", "user", "a counter"), 3)
    }

    #[test]
    fn test_should_escalate_boundary() {
        assert!(!should_escalate(2, 3));
        assert!(should_escalate(3, 3));
        assert!(should_escalate(4, 3));
    }

    #[tokio::test]
    async fn test_successful_fix_counts_attempt() {
        let provider = MockProvider::new().with_response(
            REPAIR_MARKER,
            "Replaced eval with a literal.\n```tsx\nconst a = 1;\n```",
        );
        let mut session = session();

        let outcome = reflexion(&provider, Arc::new(MemoryStore::new()))
            .attempt_fix(&context(), &mut session)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.fixed_code, "const a = 1;");
        assert_eq!(outcome.explanation, "Replaced eval with a literal.");
        assert_eq!(session.reflexion_attempts(), 1);

        let call = &provider.get_call_history()[0];
        let prompt = &call.messages[0].content;
        assert!(prompt.contains("repair attempt 2 of 3"));
        assert!(prompt.contains("- eval() is not allowed"));
        assert!(prompt.contains("Attempt 1: eval() is not allowed"));
        assert!(prompt.contains("const a = eval('1');"));
        assert!((call.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_failed_call_keeps_original_code() {
        let provider = MockProvider::new().with_failure(REPAIR_MARKER, "rate limited");
        let mut session = session();

        let outcome = reflexion(&provider, Arc::new(MemoryStore::new()))
            .attempt_fix(&context(), &mut session)
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.fixed_code, "const a = eval('1');");
        assert_eq!(session.reflexion_attempts(), 0);
    }

    #[tokio::test]
    async fn test_escalation_writes_one_review() {
        let store = Arc::new(MemoryStore::new());
        let engine = reflexion(&MockProvider::new(), Arc::clone(&store));
        let verdict = ValidationVerdict {
            is_valid: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            security_score: 0.5,
            passed_rules: vec!["max_lines".to_owned()],
            failed_rules: vec!["no_eval".to_owned(), "no_inner_html".to_owned()],
        };

        assert!(engine.escalate(&session(), &verdict).await);
        let reviews = store.reviews();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].reason, "no_eval, no_inner_html");

        store.set_offline(true);
        assert!(!engine.escalate(&session(), &verdict).await);
    }
}
