//! Session state machine driving plan, generate, validate and repair.
//!
//! ```text
//! pending -> planning -> generating|streaming -> validating -> [reflexion] ->
//!     completed | rejected | failed
//! ```
//!
//! Phases run strictly in sequence on the caller's task. Block failures drive
//! the repair loop; only pipeline errors end in `failed`.

mod run;

use crate::generator::{ChunkStream, CodeChunk, GeneratedArtifact, Generator};
use crate::reflexion::{PreviousAttempt, Reflexion, ReflexionContext, should_escalate};
use crate::validator::{RuleValidator, ValidationContext, Validator};
use async_stream::stream;
use forge_core::{
    ArtifactPublisher, Error, ForgeConfig, GenerationRequest, LogLevel, ModelProvider,
    PipelineStore, Plan, Result, Session, SessionLog, SessionStatus,
};
use forge_routing::Planner;
use futures::Stream;
use serde_json::{Value, json};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, info, warn};

use run::SessionRun;

/// Terminal session plus every log entry it produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// The session in its terminal state
    pub session: Session,
    /// Log entries in the order they were written
    pub logs: Vec<SessionLog>,
}

/// One item of a streaming run.
#[derive(Debug, Clone)]
pub enum PipelineUpdate {
    /// A session log entry
    Log(SessionLog),
    /// A slice of the generated code
    Chunk(CodeChunk),
    /// The terminal session; always the last item
    Finished(Box<Session>),
}

/// Stream returned by [`Orchestrator::execute_streaming`].
pub type PipelineStream = Pin<Box<dyn Stream<Item = PipelineUpdate> + Send>>;

/// What the validation loop does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Finished,
}

/// Components an [`Orchestrator`] is assembled from.
pub struct OrchestratorParams {
    /// Classifier and router
    pub planner: Arc<Planner>,
    /// Component generator
    pub generator: Arc<Generator>,
    /// Validation strategy
    pub validator: Arc<dyn Validator>,
    /// Repair and escalation
    pub reflexion: Arc<Reflexion>,
    /// Persistence
    pub store: Arc<dyn PipelineStore>,
    /// Where accepted artifacts go
    pub publisher: Arc<dyn ArtifactPublisher>,
    /// Attempt ceiling for new sessions
    pub max_reflexion_attempts: u32,
}

/// Drives sessions through the pipeline.
#[derive(Clone)]
pub struct Orchestrator {
    planner: Arc<Planner>,
    generator: Arc<Generator>,
    validator: Arc<dyn Validator>,
    reflexion: Arc<Reflexion>,
    store: Arc<dyn PipelineStore>,
    publisher: Arc<dyn ArtifactPublisher>,
    max_reflexion_attempts: u32,
}

impl Orchestrator {
    /// Creates an orchestrator from explicit components.
    pub fn new(params: OrchestratorParams) -> Self {
        Self {
            planner: params.planner,
            generator: params.generator,
            validator: params.validator,
            reflexion: params.reflexion,
            store: params.store,
            publisher: params.publisher,
            max_reflexion_attempts: params.max_reflexion_attempts,
        }
    }

    /// Creates an orchestrator with the standard components sharing one provider and store.
    ///
    /// # Errors
    /// Returns an error if an embedded prompt cannot be loaded.
    pub fn from_config(
        provider: Arc<dyn ModelProvider>,
        store: Arc<dyn PipelineStore>,
        publisher: Arc<dyn ArtifactPublisher>,
        config: &ForgeConfig,
    ) -> Result<Self> {
        Ok(Self::new(OrchestratorParams {
            planner: Arc::new(Planner::new(
                Arc::clone(&provider),
                Arc::clone(&store),
                config,
            )?),
            generator: Arc::new(Generator::new(
                Arc::clone(&provider),
                Arc::clone(&store),
                config,
            )?),
            validator: Arc::new(RuleValidator::new(Arc::clone(&store), &config.validation)),
            reflexion: Arc::new(Reflexion::new(provider, Arc::clone(&store), config)?),
            store,
            publisher,
            max_reflexion_attempts: config.pipeline.max_reflexion_attempts,
        }))
    }

    /// Runs a request to a terminal state.
    ///
    /// Pipeline errors do not surface here; they leave the session `failed`.
    ///
    /// # Errors
    /// Returns an error only if the session state machine is violated.
    pub async fn execute(&self, request: &GenerationRequest) -> Result<SessionReport> {
        let mut run = self.start(request).await;

        if let Err(err) = self.drive(&mut run, request).await {
            self.fail(&mut run, &err).await?;
        }

        let (session, logs) = run.into_parts();
        Ok(SessionReport { session, logs })
    }

    /// Runs a request, yielding log entries and code chunks as they are produced.
    ///
    /// The last item is always [`PipelineUpdate::Finished`]. Dropping the stream
    /// stops the run at its next suspension point.
    pub fn execute_streaming(&self, request: GenerationRequest) -> PipelineStream {
        let orchestrator = self.clone();

        Box::pin(stream! {
            let mut run = orchestrator.start(&request).await;
            let mut failure = orchestrator.plan(&mut run).await.err();
            for entry in run.drain() {
                yield PipelineUpdate::Log(entry);
            }

            if failure.is_none() {
                match orchestrator.begin_streaming(&mut run, &request).await {
                    Ok(chunks) => {
                        for entry in run.drain() {
                            yield PipelineUpdate::Log(entry);
                        }
                        for chunk in chunks {
                            yield PipelineUpdate::Chunk(chunk);
                        }
                    }
                    Err(err) => failure = Some(err),
                }
            }

            while failure.is_none() {
                let step = orchestrator.validation_step(&mut run).await;
                for entry in run.drain() {
                    yield PipelineUpdate::Log(entry);
                }
                match step {
                    Ok(Step::Continue) => {}
                    Ok(Step::Finished) => break,
                    Err(err) => failure = Some(err),
                }
            }

            if let Some(err) = failure {
                if let Err(fail_err) = orchestrator.fail(&mut run, &err).await {
                    error!("Could not mark session {} failed: {fail_err}", run.session.id);
                }
                for entry in run.drain() {
                    yield PipelineUpdate::Log(entry);
                }
            }

            let (session, _) = run.into_parts();
            yield PipelineUpdate::Finished(Box::new(session));
        })
    }

    async fn start(&self, request: &GenerationRequest) -> SessionRun {
        let session = Session::new(request, self.max_reflexion_attempts);
        if let Err(err) = self.store.create_session(&session).await {
            warn!("Failed to store new session {}: {err}", session.id);
        }
        info!("Session {} started for tenant {}", session.id, session.tenant_id);

        let mut run = SessionRun::new(session);
        run.log(
            self.store.as_ref(),
            LogLevel::Info,
            "Session created",
            json!({ "mood": request.mood, "max_reflexion_attempts": self.max_reflexion_attempts }),
        )
        .await;
        run
    }

    async fn drive(&self, run: &mut SessionRun, request: &GenerationRequest) -> Result<()> {
        self.plan(run).await?;

        let plan = current_plan(&run.session)?;
        run.advance(
            self.store.as_ref(),
            SessionStatus::Generating,
            "Generating component",
            json!({ "model": plan.model_id }),
        )
        .await?;
        let artifact = self
            .generator
            .generate_complete(&run.session, &plan, request)
            .await?;
        self.accept_artifact(run, &artifact).await?;

        while self.validation_step(run).await? == Step::Continue {}
        Ok(())
    }

    async fn plan(&self, run: &mut SessionRun) -> Result<()> {
        run.advance(
            self.store.as_ref(),
            SessionStatus::Planning,
            "Classifying request",
            Value::Null,
        )
        .await?;

        let outcome = self
            .planner
            .classify_and_plan(&run.session.prompt, run.session.mood)
            .await?;
        run.session.record_usage(outcome.usage, outcome.cost)?;

        let plan = outcome.plan;
        run.log(
            self.store.as_ref(),
            LogLevel::Info,
            "Plan ready",
            json!({
                "intent": plan.intent,
                "complexity": plan.complexity,
                "tier": plan.tier,
                "model": plan.model_id,
                "estimated_tokens": plan.estimated_tokens,
                "similar_patterns": plan.similar_patterns.len(),
            }),
        )
        .await;
        run.session.plan = Some(plan);
        Ok(())
    }

    async fn begin_streaming(
        &self,
        run: &mut SessionRun,
        request: &GenerationRequest,
    ) -> Result<ChunkStream> {
        let plan = current_plan(&run.session)?;
        run.advance(
            self.store.as_ref(),
            SessionStatus::Streaming,
            "Streaming component",
            json!({ "model": plan.model_id }),
        )
        .await?;

        let chunks = self
            .generator
            .generate_with_streaming(&run.session, &plan, request)
            .await?;
        self.accept_artifact(run, chunks.artifact()).await?;
        Ok(chunks)
    }

    async fn accept_artifact(
        &self,
        run: &mut SessionRun,
        artifact: &GeneratedArtifact,
    ) -> Result<()> {
        run.session.record_usage(artifact.usage, artifact.cost)?;
        run.session.set_code(artifact.code.clone())?;
        run.log(
            self.store.as_ref(),
            LogLevel::Info,
            "Component generated",
            json!({
                "lines": artifact.code.lines().count(),
                "tokens": artifact.usage.total(),
                "model": artifact.model_id,
            }),
        )
        .await;
        Ok(())
    }

    /// Validates the current code, then completes, rejects or repairs.
    async fn validation_step(&self, run: &mut SessionRun) -> Result<Step> {
        run.advance(
            self.store.as_ref(),
            SessionStatus::Validating,
            "Validating component",
            json!({ "attempt": run.session.reflexion_attempts() }),
        )
        .await?;

        let code = run.session.final_code().unwrap_or_default().to_owned();
        let verdict = self
            .validator
            .validate(
                &code,
                &ValidationContext::for_session(run.session.id),
                &run.session.tenant_id,
            )
            .await?;
        run.session.set_verdict(verdict.clone())?;

        let level = if verdict.is_valid {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };
        run.log(
            self.store.as_ref(),
            level,
            if verdict.is_valid {
                "Validation passed"
            } else {
                "Validation failed"
            },
            json!({
                "security_score": verdict.security_score,
                "failed_rules": verdict.failed_rules,
                "errors": verdict.error_messages(),
                "warnings": verdict.warnings.len(),
            }),
        )
        .await;

        if verdict.is_valid {
            self.complete(run, &code).await?;
            return Ok(Step::Finished);
        }

        let attempts = run.session.reflexion_attempts();
        if should_escalate(attempts, run.session.max_reflexion_attempts()) {
            let escalated = self.reflexion.escalate(&run.session, &verdict).await;
            run.advance(
                self.store.as_ref(),
                SessionStatus::Rejected,
                "Repair budget exhausted, escalated to human review",
                json!({ "attempts": attempts, "escalated": escalated }),
            )
            .await?;
            self.count_patterns(&run.session, false).await;
            return Ok(Step::Finished);
        }

        self.repair(run, code, verdict.error_messages()).await
    }

    /// Runs one repair attempt; a failed attempt rejects the session.
    async fn repair(
        &self,
        run: &mut SessionRun,
        code: String,
        errors: Vec<String>,
    ) -> Result<Step> {
        let attempt = run.session.reflexion_attempts() + 1;
        let max_attempts = run.session.max_reflexion_attempts();
        run.advance(
            self.store.as_ref(),
            SessionStatus::Reflexion,
            "Repairing component",
            json!({ "attempt": attempt, "max_attempts": max_attempts }),
        )
        .await?;

        let context = ReflexionContext {
            code,
            errors,
            attempt,
            max_attempts,
            previous_attempts: run.previous_attempts.clone(),
        };
        let outcome = self.reflexion.attempt_fix(&context, &mut run.session).await;
        run.session.record_usage(outcome.usage, outcome.cost)?;

        if !outcome.success {
            run.advance(
                self.store.as_ref(),
                SessionStatus::Rejected,
                "Repair failed",
                json!({ "attempt": attempt, "reason": outcome.explanation }),
            )
            .await?;
            self.count_patterns(&run.session, false).await;
            return Ok(Step::Finished);
        }

        run.previous_attempts.push(PreviousAttempt {
            code: context.code,
            errors: context.errors,
        });
        run.session.set_code(outcome.fixed_code)?;
        run.log(
            self.store.as_ref(),
            LogLevel::Info,
            "Repair applied",
            json!({ "attempt": attempt, "explanation": outcome.explanation }),
        )
        .await;
        Ok(Step::Continue)
    }

    async fn complete(&self, run: &mut SessionRun, code: &str) -> Result<()> {
        match self.publisher.publish(&run.session, code).await {
            Ok(artifact_id) => run.session.artifact_id = Some(artifact_id),
            Err(err) => {
                warn!("Failed to publish artifact for session {}: {err}", run.session.id);
                run.log(
                    self.store.as_ref(),
                    LogLevel::Warn,
                    "Publishing failed",
                    json!({ "error": err.to_string() }),
                )
                .await;
            }
        }

        let artifact_id = run.session.artifact_id.clone();
        run.advance(
            self.store.as_ref(),
            SessionStatus::Completed,
            "Component accepted",
            json!({ "artifact_id": artifact_id }),
        )
        .await?;
        self.count_patterns(&run.session, true).await;
        Ok(())
    }

    async fn fail(&self, run: &mut SessionRun, err: &Error) -> Result<()> {
        let phase = run.session.status();
        run.session.fail(err.to_string())?;
        error!("Session {} failed during {phase}: {err}", run.session.id);

        run.log(
            self.store.as_ref(),
            LogLevel::Error,
            &format!("Failed during {phase}"),
            json!({ "error": err.to_string(), "phase": phase }),
        )
        .await;
        run.persist(self.store.as_ref()).await;
        Ok(())
    }

    /// Updates usage counters of every pattern the plan referenced.
    async fn count_patterns(&self, session: &Session, success: bool) {
        let Some(plan) = &session.plan else {
            return;
        };
        for reference in &plan.similar_patterns {
            if let Err(err) = self.store.record_pattern_usage(&reference.id, success).await {
                warn!("Failed to record usage of pattern {}: {err}", reference.id);
            }
        }
    }
}

fn current_plan(session: &Session) -> Result<Plan> {
    session
        .plan
        .clone()
        .ok_or_else(|| Error::Other(format!("session {} has no plan", session.id)))
}
