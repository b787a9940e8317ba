//! In-process implementations of the persistence and publication collaborators.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::{
    ArtifactId, ArtifactPublisher, AuditEntry, HumanReviewRecord, PatternRecord, PipelineStore,
};
use crate::validation::{DEFAULT_ALLOWLIST, default_rules};
use crate::{
    Error, IgnoreLock as _, Intent, Result, Session, SessionId, SessionLog, ValidationRule,
};

/// Everything the memory store holds.
#[derive(Default)]
struct StoreState {
    /// Sessions in creation order
    sessions: Vec<Session>,
    /// Log entries in append order
    logs: Vec<SessionLog>,
    /// Known patterns
    patterns: Vec<PatternRecord>,
    /// Rules in insertion order
    rules: Vec<ValidationRule>,
    /// Packages allowed for every tenant
    global_allowlist: Vec<String>,
    /// Packages allowed per tenant
    tenant_allowlists: HashMap<String, Vec<String>>,
    /// Validation audit trail
    audit: Vec<AuditEntry>,
    /// Human review queue
    reviews: Vec<HumanReviewRecord>,
}

/// [`PipelineStore`] backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store with no rules and no allowlist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the standard policy and global allowlist.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::with_policy(500)
    }

    /// Creates a store seeded with the standard policy at a custom line limit.
    #[must_use]
    pub fn with_policy(max_lines: usize) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock_ignore_poison();
            state.rules = default_rules(max_lines);
            state.global_allowlist = DEFAULT_ALLOWLIST
                .iter()
                .map(|name| (*name).to_owned())
                .collect();
        }
        store
    }

    /// Simulates an outage: while offline every call fails with [`Error::Store`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Validation audit entries written so far.
    #[must_use]
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock_ignore_poison().audit.clone()
    }

    /// Human review records written so far.
    #[must_use]
    pub fn reviews(&self) -> Vec<HumanReviewRecord> {
        self.state.lock_ignore_poison().reviews.clone()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Store("memory store is offline".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        self.ensure_online()?;
        let mut state = self.state.lock_ignore_poison();
        if state.sessions.iter().any(|stored| stored.id == session.id) {
            return Err(Error::Store(format!("session {} already exists", session.id)));
        }
        state.sessions.push(session.clone());
        Ok(())
    }

    async fn update_session(&self, session: &Session) -> Result<()> {
        self.ensure_online()?;
        let mut state = self.state.lock_ignore_poison();
        let stored = state
            .sessions
            .iter_mut()
            .find(|stored| stored.id == session.id)
            .ok_or_else(|| Error::Store(format!("session {} not found", session.id)))?;
        *stored = session.clone();
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
        self.ensure_online()?;
        let state = self.state.lock_ignore_poison();
        Ok(state.sessions.iter().find(|session| session.id == id).cloned())
    }

    async fn list_sessions(&self, tenant_id: &str) -> Result<Vec<Session>> {
        self.ensure_online()?;
        let state = self.state.lock_ignore_poison();
        Ok(state
            .sessions
            .iter()
            .filter(|session| session.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn append_log(&self, entry: SessionLog) -> Result<()> {
        self.ensure_online()?;
        self.state.lock_ignore_poison().logs.push(entry);
        Ok(())
    }

    async fn session_logs(&self, id: SessionId) -> Result<Vec<SessionLog>> {
        self.ensure_online()?;
        let state = self.state.lock_ignore_poison();
        Ok(state
            .logs
            .iter()
            .filter(|entry| entry.session_id == id)
            .cloned()
            .collect())
    }

    async fn list_patterns(&self, intent: Option<Intent>) -> Result<Vec<PatternRecord>> {
        self.ensure_online()?;
        let state = self.state.lock_ignore_poison();
        Ok(state
            .patterns
            .iter()
            .filter(|pattern| intent.is_none_or(|wanted| pattern.intent == wanted))
            .cloned()
            .collect())
    }

    async fn get_pattern(&self, id: &str) -> Result<Option<PatternRecord>> {
        self.ensure_online()?;
        let state = self.state.lock_ignore_poison();
        Ok(state.patterns.iter().find(|pattern| pattern.id == id).cloned())
    }

    async fn save_pattern(&self, pattern: PatternRecord) -> Result<()> {
        self.ensure_online()?;
        let mut state = self.state.lock_ignore_poison();
        if let Some(stored) = state.patterns.iter_mut().find(|stored| stored.id == pattern.id) {
            *stored = pattern;
        } else {
            state.patterns.push(pattern);
        }
        Ok(())
    }

    async fn record_pattern_usage(&self, id: &str, success: bool) -> Result<()> {
        self.ensure_online()?;
        let mut state = self.state.lock_ignore_poison();
        let pattern = state
            .patterns
            .iter_mut()
            .find(|pattern| pattern.id == id)
            .ok_or_else(|| Error::Store(format!("pattern {id} not found")))?;

        pattern.usage_count += 1;
        if success {
            pattern.success_count += 1;
        } else {
            pattern.failure_count += 1;
        }
        Ok(())
    }

    async fn active_rules(&self, tenant_id: &str) -> Result<Vec<ValidationRule>> {
        self.ensure_online()?;
        let state = self.state.lock_ignore_poison();
        Ok(state
            .rules
            .iter()
            .filter(|rule| rule.applies_to(tenant_id))
            .cloned()
            .collect())
    }

    async fn allowlist(&self, tenant_id: &str) -> Result<Vec<String>> {
        self.ensure_online()?;
        let state = self.state.lock_ignore_poison();
        let tenant_entries = state
            .tenant_allowlists
            .get(tenant_id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut resolved: Vec<String> = Vec::new();
        for package in tenant_entries.iter().chain(&state.global_allowlist) {
            if !resolved.contains(package) {
                resolved.push(package.clone());
            }
        }
        Ok(resolved)
    }

    async fn upsert_rule(&self, rule: ValidationRule) -> Result<()> {
        self.ensure_online()?;
        let mut state = self.state.lock_ignore_poison();
        if let Some(stored) = state
            .rules
            .iter_mut()
            .find(|stored| stored.name == rule.name && stored.tenant_id == rule.tenant_id)
        {
            *stored = rule;
        } else {
            state.rules.push(rule);
        }
        Ok(())
    }

    async fn add_allowed_dependency(&self, tenant_id: Option<&str>, package: &str) -> Result<()> {
        self.ensure_online()?;
        let mut state = self.state.lock_ignore_poison();
        let list = match tenant_id {
            Some(tenant) => state.tenant_allowlists.entry(tenant.to_owned()).or_default(),
            None => &mut state.global_allowlist,
        };
        if !list.iter().any(|existing| existing == package) {
            list.push(package.to_owned());
        }
        Ok(())
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<()> {
        self.ensure_online()?;
        self.state.lock_ignore_poison().audit.push(entry);
        Ok(())
    }

    async fn create_review(&self, record: HumanReviewRecord) -> Result<()> {
        self.ensure_online()?;
        self.state.lock_ignore_poison().reviews.push(record);
        Ok(())
    }
}

/// [`ArtifactPublisher`] that keeps published code in memory.
#[derive(Default)]
pub struct MemoryPublisher {
    artifacts: Mutex<Vec<(ArtifactId, SessionId, String)>>,
    offline: AtomicBool,
}

impl MemoryPublisher {
    /// Creates an empty publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: while offline every publish fails with [`Error::Publish`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Code published for a session, if any.
    #[must_use]
    pub fn published_code(&self, session_id: SessionId) -> Option<String> {
        let artifacts = self.artifacts.lock_ignore_poison();
        artifacts
            .iter()
            .find(|(_, owner, _)| *owner == session_id)
            .map(|(_, _, code)| code.clone())
    }

    /// Number of published artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.lock_ignore_poison().len()
    }

    /// Whether nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArtifactPublisher for MemoryPublisher {
    async fn publish(&self, session: &Session, code: &str) -> Result<ArtifactId> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Publish("memory publisher is offline".to_owned()));
        }
        let id = format!("artifact-{}", Uuid::new_v4());
        self.artifacts
            .lock_ignore_poison()
            .push((id.clone(), session.id, code.to_owned()));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GenerationRequest, Severity};

    #[tokio::test]
    async fn test_allowlist_merges_tenant_and_global() -> Result<()> {
        let store = MemoryStore::new();
        store.add_allowed_dependency(None, "react").await?;
        store.add_allowed_dependency(Some("acme"), "d3").await?;
        store.add_allowed_dependency(Some("acme"), "react").await?;

        assert_eq!(store.allowlist("acme").await?, vec!["d3", "react"]);
        assert_eq!(store.allowlist("globex").await?, vec!["react"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_active_rules_respect_scope_and_enabled() -> Result<()> {
        let store = MemoryStore::new();
        store
            .upsert_rule(
                ValidationRule::pattern("no_alert", r"alert\(", Severity::Block).for_tenant("acme"),
            )
            .await?;
        let mut disabled = ValidationRule::max_lines("max_lines", 10, Severity::Block);
        disabled.enabled = false;
        store.upsert_rule(disabled).await?;

        assert_eq!(store.active_rules("acme").await?.len(), 1);
        assert!(store.active_rules("globex").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_name_and_scope() -> Result<()> {
        let store = MemoryStore::with_defaults();
        let before = store.active_rules("acme").await?.len();
        store
            .upsert_rule(ValidationRule::max_lines("max_lines", 200, Severity::Block))
            .await?;

        let rules = store.active_rules("acme").await?;
        assert_eq!(rules.len(), before);
        assert!(rules.iter().any(|rule| matches!(
            rule.kind,
            crate::RuleKind::ResourceLimit { max: 200, .. }
        )));
        Ok(())
    }

    #[tokio::test]
    async fn test_pattern_usage_counters() -> Result<()> {
        let store = MemoryStore::new();
        store
            .save_pattern(PatternRecord::new("p1", "Tip calculator", Intent::Calculator))
            .await?;
        store.record_pattern_usage("p1", true).await?;
        store.record_pattern_usage("p1", false).await?;
        store.record_pattern_usage("missing", true).await.unwrap_err();

        let pattern = store.get_pattern("p1").await?;
        let counts = pattern.map(|stored| {
            (
                stored.usage_count,
                stored.success_count,
                stored.failure_count,
            )
        });
        assert_eq!(counts, Some((2, 1, 1)));
        Ok(())
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_call() -> Result<()> {
        let store = MemoryStore::with_defaults();
        let session = Session::new(&GenerationRequest::new("acme", "user", "a form"), 3);
        store.create_session(&session).await?;

        store.set_offline(true);
        store.active_rules("acme").await.unwrap_err();
        store.get_session(session.id).await.unwrap_err();

        store.set_offline(false);
        assert!(store.get_session(session.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_publisher_records_artifacts() -> Result<()> {
        let publisher = MemoryPublisher::new();
        let session = Session::new(&GenerationRequest::new("acme", "user", "a chart"), 3);

        let id = publisher.publish(&session, "export default 1;").await?;
        assert!(id.starts_with("artifact-"));
        assert_eq!(
            publisher.published_code(session.id).as_deref(),
            Some("export default 1;")
        );

        publisher.set_offline(true);
        publisher.publish(&session, "x").await.unwrap_err();
        assert_eq!(publisher.len(), 1);
        Ok(())
    }
}
