//! Generate, validate and self-correct pipeline for UI components.
//!
//! The [`Orchestrator`] drives each session through planning, generation,
//! rule validation and bounded [`Reflexion`] repair. Sessions that stay
//! non-compliant after the attempt budget are escalated to human review.
//!
//! Every collaborator is injected: the model provider, the store and the
//! artifact publisher are traits from `forge_core`.
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

/// Component generation and chunked streaming.
pub mod generator;
/// Tenant metrics and session lookups.
pub mod metrics;
/// Session state machine.
pub mod orchestrator;
/// Bounded repair and escalation.
pub mod reflexion;
/// Rule-based validation.
pub mod validator;

pub use generator::{
    ChunkStream, CodeChunk, GeneratedArtifact, Generator, extract_code, leading_prose,
};
pub use metrics::{IntentCount, SessionDetail, SessionQuery, SessionSummary, TenantMetrics};
pub use orchestrator::{
    Orchestrator, OrchestratorParams, PipelineStream, PipelineUpdate, SessionReport,
};
pub use reflexion::{
    PreviousAttempt, Reflexion, ReflexionContext, ReflexionOutcome, should_escalate,
};
pub use validator::{RuleValidator, ValidationContext, Validator};
