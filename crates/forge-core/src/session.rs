//! Sessions: the unit of work for one generation request.
//!
//! A session moves forward through a fixed state machine:
//!
//! ```text
//! pending -> planning -> generating|streaming -> validating -> completed
//!                                                  |   ^     -> rejected
//!                                                  v   |
//!                                                reflexion  -> rejected
//! ```
//!
//! Any non-terminal status may move to `failed`. Terminal sessions never change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Plan, Result, TokenUsage, ValidationVerdict};

/// Unique identifier for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Status of a session in the pipeline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Request accepted, nothing has run yet
    Pending,
    /// Planner is classifying the request
    Planning,
    /// Generator is producing the artifact (blocking entry point)
    Generating,
    /// Generator is producing the artifact (streaming entry point)
    Streaming,
    /// Validator is checking the current artifact
    Validating,
    /// Reflexion is repairing a failed artifact
    Reflexion,
    /// Artifact passed validation and was published
    Completed,
    /// Artifact is non-compliant after best-effort repair
    Rejected,
    /// The pipeline itself malfunctioned
    Failed,
}

impl SessionStatus {
    /// Whether the session can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Failed)
    }

    /// Whether moving from `self` to `next` is an edge of the state machine.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::Failed)
                | (Self::Pending, Self::Planning)
                | (Self::Planning, Self::Generating | Self::Streaming)
                | (Self::Generating | Self::Streaming, Self::Validating)
                | (
                    Self::Validating,
                    Self::Completed | Self::Rejected | Self::Reflexion
                )
                | (Self::Reflexion, Self::Validating | Self::Rejected)
        )
    }

    /// Lowercase name used in logs and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Planning => "planning",
            Self::Generating => "generating",
            Self::Streaming => "streaming",
            Self::Validating => "validating",
            Self::Reflexion => "reflexion",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Tone the user asked for; only `Exploratory` changes model selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// No particular preference
    #[default]
    Balanced,
    /// Keep the result tight and conventional
    Focused,
    /// Try creative or unusual designs
    Exploratory,
}

impl FromStr for Mood {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "balanced" => Ok(Self::Balanced),
            "focused" => Ok(Self::Focused),
            "exploratory" => Ok(Self::Exploratory),
            other => Err(Error::Config(format!("unknown mood: {other}"))),
        }
    }
}

/// Incoming request to generate one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Tenant the request belongs to
    pub tenant_id: String,
    /// User who issued the request
    pub user_id: String,
    /// Natural-language description of the component
    pub prompt: String,
    /// Requested tone
    #[serde(default)]
    pub mood: Mood,
}

impl GenerationRequest {
    /// Creates a request with the default mood.
    pub fn new<T, U, P>(tenant_id: T, user_id: U, prompt: P) -> Self
    where
        T: Into<String>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            prompt: prompt.into(),
            mood: Mood::default(),
        }
    }

    /// Sets the mood.
    #[must_use]
    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = mood;
        self
    }
}

/// When each phase of a session started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTimestamps {
    /// Session accepted
    pub created_at: DateTime<Utc>,
    /// Planner started
    pub planning_started_at: Option<DateTime<Utc>>,
    /// Generator started
    pub generation_started_at: Option<DateTime<Utc>>,
    /// First validation started
    pub validation_started_at: Option<DateTime<Utc>>,
    /// Terminal status reached
    pub finished_at: Option<DateTime<Utc>>,
}

impl PhaseTimestamps {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            planning_started_at: None,
            generation_started_at: None,
            validation_started_at: None,
            finished_at: None,
        }
    }

    /// Milliseconds between creation and the terminal status, if finished.
    #[must_use]
    pub fn total_duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.created_at).num_milliseconds())
    }
}

/// The unit of work for one generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,
    /// Owning tenant
    pub tenant_id: String,
    /// Requesting user
    pub user_id: String,
    /// Originating prompt
    pub prompt: String,
    /// Requested tone
    pub mood: Mood,
    /// Planner output, set once planning finishes
    pub plan: Option<Plan>,
    status: SessionStatus,
    verdict: Option<ValidationVerdict>,
    reflexion_attempts: u32,
    max_reflexion_attempts: u32,
    final_code: Option<String>,
    /// Identifier returned by the publication collaborator
    pub artifact_id: Option<String>,
    /// Cumulative token usage across all model calls
    pub tokens_used: TokenUsage,
    /// Estimated cost in USD
    pub estimated_cost: f64,
    /// Phase timestamps
    pub timestamps: PhaseTimestamps,
    /// Failure description for `failed` sessions
    pub error: Option<String>,
}

impl Session {
    /// Creates a pending session for a request.
    pub fn new(request: &GenerationRequest, max_reflexion_attempts: u32) -> Self {
        Self {
            id: SessionId::new(),
            tenant_id: request.tenant_id.clone(),
            user_id: request.user_id.clone(),
            prompt: request.prompt.clone(),
            mood: request.mood,
            plan: None,
            status: SessionStatus::Pending,
            verdict: None,
            reflexion_attempts: 0,
            max_reflexion_attempts,
            final_code: None,
            artifact_id: None,
            tokens_used: TokenUsage::default(),
            estimated_cost: 0.0,
            timestamps: PhaseTimestamps::new(),
            error: None,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Latest validation verdict.
    #[must_use]
    pub fn verdict(&self) -> Option<&ValidationVerdict> {
        self.verdict.as_ref()
    }

    /// Number of reflexion attempts taken.
    #[must_use]
    pub fn reflexion_attempts(&self) -> u32 {
        self.reflexion_attempts
    }

    /// Configured attempt ceiling.
    #[must_use]
    pub fn max_reflexion_attempts(&self) -> u32 {
        self.max_reflexion_attempts
    }

    /// Latest accepted-or-attempted artifact.
    #[must_use]
    pub fn final_code(&self) -> Option<&str> {
        self.final_code.as_deref()
    }

    /// Moves the session to `next`, stamping phase timestamps.
    ///
    /// # Errors
    /// Returns `Error::InvalidTransition` if the state machine has no such edge.
    pub fn transition(&mut self, next: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let now = Utc::now();
        match next {
            SessionStatus::Planning => self.timestamps.planning_started_at = Some(now),
            SessionStatus::Generating | SessionStatus::Streaming => {
                self.timestamps.generation_started_at = Some(now);
            }
            SessionStatus::Validating => {
                if self.timestamps.validation_started_at.is_none() {
                    self.timestamps.validation_started_at = Some(now);
                }
            }
            SessionStatus::Completed | SessionStatus::Rejected | SessionStatus::Failed => {
                self.timestamps.finished_at = Some(now);
            }
            SessionStatus::Pending | SessionStatus::Reflexion => {}
        }

        self.status = next;
        Ok(())
    }

    /// Marks the session failed with the given reason.
    ///
    /// # Errors
    /// Returns an error if the session is already terminal.
    pub fn fail<T: Into<String>>(&mut self, reason: T) -> Result<()> {
        self.transition(SessionStatus::Failed)?;
        self.error = Some(reason.into());
        Ok(())
    }

    /// Replaces the current artifact.
    ///
    /// # Errors
    /// Returns an error if the session is terminal.
    pub fn set_code<T: Into<String>>(&mut self, code: T) -> Result<()> {
        self.ensure_mutable()?;
        self.final_code = Some(code.into());
        Ok(())
    }

    /// Attaches the latest verdict.
    ///
    /// # Errors
    /// Returns an error if the session is terminal.
    pub fn set_verdict(&mut self, verdict: ValidationVerdict) -> Result<()> {
        self.ensure_mutable()?;
        self.verdict = Some(verdict);
        Ok(())
    }

    /// Adds token usage and its cost.
    ///
    /// # Errors
    /// Returns an error if the session is terminal.
    pub fn record_usage(&mut self, usage: TokenUsage, cost: f64) -> Result<()> {
        self.ensure_mutable()?;
        self.tokens_used.add(usage);
        self.estimated_cost += cost;
        Ok(())
    }

    /// Counts one reflexion attempt. Returns `false` once the ceiling is reached.
    pub fn record_reflexion_attempt(&mut self) -> bool {
        if self.status.is_terminal() || self.reflexion_attempts >= self.max_reflexion_attempts {
            return false;
        }
        self.reflexion_attempts += 1;
        true
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::Other(format!(
                "session {} is {} and can no longer change",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

/// Severity of a session log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Normal progress
    Info,
    /// Recoverable problem
    Warn,
    /// Failure
    Error,
}

/// Append-only progress entry for one phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLog {
    /// Session the entry belongs to
    pub session_id: SessionId,
    /// Phase that produced the entry
    pub phase: SessionStatus,
    /// Severity
    pub level: LogLevel,
    /// Human-readable message
    pub message: String,
    /// Structured details
    pub data: Value,
    /// When the entry was written
    pub timestamp: DateTime<Utc>,
}

impl SessionLog {
    /// Creates an entry stamped with the current time.
    pub fn new<T: Into<String>>(
        session_id: SessionId,
        phase: SessionStatus,
        level: LogLevel,
        message: T,
    ) -> Self {
        Self {
            session_id,
            phase,
            level,
            message: message.into(),
            data: Value::Null,
            timestamp: Utc::now(),
        }
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_session() -> Session {
        Session::new(&GenerationRequest::new("tenant", "user", "a calculator"), 3)
    }

    #[test]
    fn test_happy_path_transitions() -> Result<()> {
        let mut session = pending_session();
        session.transition(SessionStatus::Planning)?;
        session.transition(SessionStatus::Generating)?;
        session.transition(SessionStatus::Validating)?;
        session.transition(SessionStatus::Reflexion)?;
        session.transition(SessionStatus::Validating)?;
        session.transition(SessionStatus::Completed)?;

        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(session.timestamps.finished_at.is_some());
        assert!(session.timestamps.total_duration_ms().is_some());
        Ok(())
    }

    #[test]
    fn test_backward_transition_rejected() -> Result<()> {
        let mut session = pending_session();
        session.transition(SessionStatus::Planning)?;

        let error = session.transition(SessionStatus::Pending).unwrap_err();
        assert!(matches!(error, Error::InvalidTransition { .. }));
        assert_eq!(session.status(), SessionStatus::Planning);
        Ok(())
    }

    #[test]
    fn test_terminal_session_is_frozen() -> Result<()> {
        let mut session = pending_session();
        session.fail("provider exploded")?;

        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.error.as_deref(), Some("provider exploded"));
        session.transition(SessionStatus::Planning).unwrap_err();
        session.set_code("const x = 1;").unwrap_err();
        assert!(!session.record_reflexion_attempt());
        Ok(())
    }

    #[test]
    fn test_reflexion_attempts_capped() {
        let mut session = pending_session();
        assert!(session.record_reflexion_attempt());
        assert!(session.record_reflexion_attempt());
        assert!(session.record_reflexion_attempt());
        assert!(!session.record_reflexion_attempt());
        assert_eq!(session.reflexion_attempts(), 3);
    }

    #[test]
    fn test_validation_timestamp_kept_on_retry() -> Result<()> {
        let mut session = pending_session();
        session.transition(SessionStatus::Planning)?;
        session.transition(SessionStatus::Streaming)?;
        session.transition(SessionStatus::Validating)?;
        let first = session.timestamps.validation_started_at;
        session.transition(SessionStatus::Reflexion)?;
        session.transition(SessionStatus::Validating)?;
        assert_eq!(session.timestamps.validation_started_at, first);
        Ok(())
    }

    #[test]
    fn test_mood_parsing() {
        assert_eq!("Exploratory".parse::<Mood>().ok(), Some(Mood::Exploratory));
        "grumpy".parse::<Mood>().unwrap_err();
    }
}
