//! Per-session bookkeeping shared by both entry points.

use crate::reflexion::PreviousAttempt;
use forge_core::{LogLevel, PipelineStore, Result, Session, SessionLog, SessionStatus};
use serde_json::Value;
use tracing::warn;

/// A session in flight plus the log entries it has produced.
pub struct SessionRun {
    /// The session being driven
    pub session: Session,
    /// Repairs that did not validate
    pub previous_attempts: Vec<PreviousAttempt>,
    history: Vec<SessionLog>,
    pending: Vec<SessionLog>,
}

impl SessionRun {
    pub(super) fn new(session: Session) -> Self {
        Self {
            session,
            previous_attempts: Vec::new(),
            history: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Moves to `next`, then logs and persists the change.
    ///
    /// # Errors
    /// Returns an error if the state machine has no such edge.
    pub(super) async fn advance(
        &mut self,
        store: &dyn PipelineStore,
        next: SessionStatus,
        message: &str,
        data: Value,
    ) -> Result<()> {
        self.session.transition(next)?;
        self.log(store, LogLevel::Info, message, data).await;
        self.persist(store).await;
        Ok(())
    }

    /// Appends a log entry for the current phase.
    pub(super) async fn log(
        &mut self,
        store: &dyn PipelineStore,
        level: LogLevel,
        message: &str,
        data: Value,
    ) {
        let entry = SessionLog::new(self.session.id, self.session.status(), level, message)
            .with_data(data);
        if let Err(err) = store.append_log(entry.clone()).await {
            warn!("Failed to store log for session {}: {err}", self.session.id);
        }
        self.history.push(entry.clone());
        self.pending.push(entry);
    }

    /// Writes the current session state.
    pub(super) async fn persist(&self, store: &dyn PipelineStore) {
        if let Err(err) = store.update_session(&self.session).await {
            warn!("Failed to persist session {}: {err}", self.session.id);
        }
    }

    /// Log entries produced since the last drain.
    pub(super) fn drain(&mut self) -> Vec<SessionLog> {
        self.pending.drain(..).collect()
    }

    pub(super) fn into_parts(self) -> (Session, Vec<SessionLog>) {
        (self.session, self.history)
    }
}
