//! Core types and traits for the forge generation pipeline.
//!
//! This crate provides the data model shared by every pipeline component
//! (sessions, plans, validation rules and verdicts), error handling,
//! configuration, and the collaborator traits the pipeline is wired through.
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

/// Pipeline configuration loaded from TOML.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Planner output: intent, complexity, steps and model choice.
pub mod plan;
/// Embedded prompt templates.
pub mod prompts;
/// Sessions, their state machine, and phase logs.
pub mod session;
/// Persistence and publication collaborator traits.
pub mod store;
/// Synchronization helpers.
pub mod sync;
/// Trait definitions for model providers.
pub mod traits;
/// Model invocation request and response types.
pub mod types;
/// Validation rules and verdicts.
pub mod validation;

pub use config::{ApiKeys, ForgeConfig, ModelConfig, PipelineConfig, ValidationConfig};
pub use error::{Error, Result};
pub use plan::{Complexity, Intent, ModelTier, PatternReference, Plan};
pub use session::{
    GenerationRequest, LogLevel, Mood, PhaseTimestamps, Session, SessionId, SessionLog,
    SessionStatus,
};
pub use store::{
    ArtifactId, ArtifactPublisher, AuditEntry, HumanReviewRecord, MemoryPublisher, MemoryStore,
    PatternRecord, PipelineStore,
};
pub use sync::IgnoreLock;
pub use traits::ModelProvider;
pub use types::{ChatMessage, ModelRequest, ModelResponse, Role, TokenUsage};
pub use validation::{
    DEFAULT_ALLOWLIST, ResourceMetric, RuleKind, Severity, ValidationIssue, ValidationRule,
    ValidationVerdict, default_rules,
};
