//! Collaborators the pipeline persists and publishes through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Intent, Result, Session, SessionId, SessionLog, ValidationRule};

/// In-memory store and publisher.
pub mod memory;

pub use memory::{MemoryPublisher, MemoryStore};

/// Opaque identifier returned by an [`ArtifactPublisher`].
pub type ArtifactId = String;

/// A previously generated component kept as a style reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    /// Pattern identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Intent the pattern was generated for
    pub intent: Intent,
    /// Source code, when retained
    pub code: Option<String>,
    /// Times the pattern was referenced by a plan
    pub usage_count: u64,
    /// Referencing sessions that completed
    pub success_count: u64,
    /// Referencing sessions that were rejected
    pub failure_count: u64,
}

impl PatternRecord {
    /// Creates an unused pattern.
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N, intent: Intent) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            intent,
            code: None,
            usage_count: 0,
            success_count: 0,
            failure_count: 0,
        }
    }

    /// Attaches source code.
    #[must_use]
    pub fn with_code<T: Into<String>>(mut self, code: T) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Fraction of finished referencing sessions that completed.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let finished = self.success_count + self.failure_count;
        if finished == 0 {
            0.0
        } else {
            self.success_count as f64 / finished as f64
        }
    }
}

/// Summary written once per validation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Tenant the code was validated for
    pub tenant_id: String,
    /// Session, when validation ran inside the pipeline
    pub session_id: Option<SessionId>,
    /// Number of rules that passed
    pub passed: usize,
    /// Number of rules that failed
    pub failed: usize,
    /// Whether the verdict was valid
    pub is_valid: bool,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

/// A session handed to the human review queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanReviewRecord {
    /// Escalated session
    pub session_id: SessionId,
    /// Owning tenant
    pub tenant_id: String,
    /// Failed rule names joined with `, `
    pub reason: String,
    /// Reflexion attempts taken before escalation
    pub recovery_attempts: u32,
    /// Last artifact the pipeline produced
    pub final_code: Option<String>,
    /// When the record was written
    pub created_at: DateTime<Utc>,
}

/// Persistence collaborator.
///
/// Reads gate control flow and their errors propagate; the pipeline treats
/// writes as fire-and-forget and only traces their failures.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Stores a new session.
    async fn create_session(&self, session: &Session) -> Result<()>;

    /// Replaces a stored session.
    async fn update_session(&self, session: &Session) -> Result<()>;

    /// Fetches a session by id.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>>;

    /// Every session of a tenant, oldest first.
    async fn list_sessions(&self, tenant_id: &str) -> Result<Vec<Session>>;

    /// Appends a log entry; entries are never changed afterwards.
    async fn append_log(&self, entry: SessionLog) -> Result<()>;

    /// Log entries of a session in append order.
    async fn session_logs(&self, id: SessionId) -> Result<Vec<SessionLog>>;

    /// Stored patterns, optionally restricted to one intent.
    async fn list_patterns(&self, intent: Option<Intent>) -> Result<Vec<PatternRecord>>;

    /// Fetches a pattern by id.
    async fn get_pattern(&self, id: &str) -> Result<Option<PatternRecord>>;

    /// Inserts or replaces a pattern.
    async fn save_pattern(&self, pattern: PatternRecord) -> Result<()>;

    /// Counts one use of a pattern and its outcome.
    async fn record_pattern_usage(&self, id: &str, success: bool) -> Result<()>;

    /// Enabled rules that are global or scoped to `tenant_id`.
    async fn active_rules(&self, tenant_id: &str) -> Result<Vec<ValidationRule>>;

    /// Resolved allowlist: tenant entries plus global entries.
    async fn allowlist(&self, tenant_id: &str) -> Result<Vec<String>>;

    /// Inserts a rule or replaces the one with the same name and scope.
    async fn upsert_rule(&self, rule: ValidationRule) -> Result<()>;

    /// Allows a package for one tenant, or globally when `tenant_id` is `None`.
    async fn add_allowed_dependency(&self, tenant_id: Option<&str>, package: &str) -> Result<()>;

    /// Appends a validation audit entry.
    async fn append_audit(&self, entry: AuditEntry) -> Result<()>;

    /// Writes a human review record.
    async fn create_review(&self, record: HumanReviewRecord) -> Result<()>;
}

/// Artifact publication collaborator.
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Publishes validated code and returns its artifact id.
    async fn publish(&self, session: &Session, code: &str) -> Result<ArtifactId>;
}
