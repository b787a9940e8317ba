//! Read-side queries over stored sessions.

use chrono::{DateTime, Utc};
use core::cmp::Reverse;
use forge_core::{Intent, PipelineStore, Result, Session, SessionId, SessionLog, SessionStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Number of intents reported in [`TenantMetrics::top_intents`].
const TOP_INTENTS: usize = 5;
/// Number of sessions reported in [`TenantMetrics::recent_sessions`].
const RECENT_SESSIONS: usize = 10;

/// A stored session with its log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    /// The session
    pub session: Session,
    /// Its log entries in write order
    pub logs: Vec<SessionLog>,
}

/// Sessions per intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentCount {
    /// Intent
    pub intent: Intent,
    /// Number of sessions planned with it
    pub count: usize,
}

/// Short form of a session for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id
    pub id: SessionId,
    /// Original request
    pub prompt: String,
    /// Current status
    pub status: SessionStatus,
    /// Planned intent, if planning finished
    pub intent: Option<Intent>,
    /// Repair attempts taken
    pub reflexion_attempts: u32,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            prompt: session.prompt.clone(),
            status: session.status(),
            intent: session.plan.as_ref().map(|plan| plan.intent),
            reflexion_attempts: session.reflexion_attempts(),
            created_at: session.timestamps.created_at,
        }
    }
}

/// Aggregate figures for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantMetrics {
    /// Sessions recorded
    pub total_generated: usize,
    /// Share of sessions that completed (0.0 to 1.0)
    pub success_rate: f64,
    /// Mean wall-clock time of finished sessions
    pub average_generation_time_ms: f64,
    /// Share of sessions that needed at least one repair (0.0 to 1.0)
    pub reflexion_rate: f64,
    /// Tokens across all sessions
    pub total_tokens: u64,
    /// Estimated cost across all sessions in USD
    pub total_cost: f64,
    /// Most frequent intents, most frequent first
    pub top_intents: Vec<IntentCount>,
    /// Newest sessions first
    pub recent_sessions: Vec<SessionSummary>,
}

/// Session and metrics lookups backed by a [`PipelineStore`].
pub struct SessionQuery {
    store: Arc<dyn PipelineStore>,
}

impl SessionQuery {
    /// Creates a query handle.
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store }
    }

    /// Loads a session and its log.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn get_session(&self, id: SessionId) -> Result<Option<SessionDetail>> {
        let Some(session) = self.store.get_session(id).await? else {
            return Ok(None);
        };
        let logs = self.store.session_logs(id).await?;
        Ok(Some(SessionDetail { session, logs }))
    }

    /// Computes metrics over every session of `tenant_id`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn get_metrics(&self, tenant_id: &str) -> Result<TenantMetrics> {
        let sessions = self.store.list_sessions(tenant_id).await?;
        Ok(summarize(sessions))
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn summarize(mut sessions: Vec<Session>) -> TenantMetrics {
    let total = sessions.len();
    let completed = sessions
        .iter()
        .filter(|session| session.status() == SessionStatus::Completed)
        .count();
    let repaired = sessions
        .iter()
        .filter(|session| session.reflexion_attempts() > 0)
        .count();

    let durations: Vec<i64> = sessions
        .iter()
        .filter_map(|session| session.timestamps.total_duration_ms())
        .collect();
    let average_generation_time_ms = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<i64>() as f64 / durations.len() as f64
    };

    let mut intent_counts: HashMap<Intent, usize> = HashMap::new();
    for plan in sessions.iter().filter_map(|session| session.plan.as_ref()) {
        *intent_counts.entry(plan.intent).or_default() += 1;
    }
    let mut top_intents: Vec<IntentCount> = intent_counts
        .into_iter()
        .map(|(intent, count)| IntentCount { intent, count })
        .collect();
    top_intents.sort_by(|left, right| {
        right
            .count
            .cmp(&left.count)
            .then_with(|| left.intent.as_str().cmp(right.intent.as_str()))
    });
    top_intents.truncate(TOP_INTENTS);

    let total_tokens = sessions.iter().map(|session| session.tokens_used.total()).sum();
    let total_cost = sessions.iter().map(|session| session.estimated_cost).sum();

    sessions.sort_by_key(|session| Reverse(session.timestamps.created_at));
    let recent_sessions = sessions
        .iter()
        .take(RECENT_SESSIONS)
        .map(SessionSummary::from)
        .collect();

    TenantMetrics {
        total_generated: total,
        success_rate: ratio(completed, total),
        average_generation_time_ms,
        reflexion_rate: ratio(repaired, total),
        total_tokens,
        total_cost,
        top_intents,
        recent_sessions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tenant() {
        let metrics = summarize(Vec::new());
        assert_eq!(metrics.total_generated, 0);
        assert!(metrics.success_rate.abs() < f64::EPSILON);
        assert!(metrics.average_generation_time_ms.abs() < f64::EPSILON);
        assert!(metrics.top_intents.is_empty());
        assert!(metrics.recent_sessions.is_empty());
    }

    #[test]
    fn test_ratio() {
        assert!((ratio(1, 4) - 0.25).abs() < f64::EPSILON);
        assert!(ratio(3, 0).abs() < f64::EPSILON);
    }
}
