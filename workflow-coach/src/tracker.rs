//! Workflow state tracking for incoming activity
//!
//! The tracker owns the find-or-create-and-append step for each
//! (user, session) pair and decides when a workflow is due for analysis.
//! Appends for one pair are serialized by a per-pair async mutex; distinct
//! pairs proceed concurrently. A pair's lock entry is dropped again as soon
//! as no recorder holds it. Triggered analyses are handed to the background
//! [`AnalysisQueue`] without waiting.

use crate::classifier::classify;
use crate::error::{CoachError, CoachResult};
use crate::queue::AnalysisQueue;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};
use uuid::Uuid;
use workflow_coach_sdk::{
    ActivityEvent, Command, ModelSwitch, RepositoryResult, Workflow, WorkflowRepository,
};

/// Analysis re-runs every this many steps
pub const ANALYSIS_STEP_INTERVAL: usize = 5;
/// Analysis re-runs when the last one is older than this
pub const ANALYSIS_MAX_AGE_MINUTES: i64 = 5;

type SessionKey = (String, String);

pub struct WorkflowStateTracker {
    repository: Arc<dyn WorkflowRepository>,
    queue: AnalysisQueue,
    session_locks: Mutex<HashMap<SessionKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl WorkflowStateTracker {
    pub fn new(repository: Arc<dyn WorkflowRepository>, queue: AnalysisQueue) -> Self {
        Self {
            repository,
            queue,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Record one activity event
    ///
    /// Returns the id of the workflow the event was recorded on, or `None`
    /// when the repository failed (the error is logged, never propagated).
    pub async fn record_activity(
        &self,
        user_id: &str,
        session_id: &str,
        event: ActivityEvent,
    ) -> Option<Uuid> {
        let appended = self.append_event(user_id, session_id, &event).await;
        self.release_session_lock(user_id, session_id);

        match appended {
            Ok(workflow) => {
                debug!(
                    workflow_id = %workflow.id,
                    kind = event.kind(),
                    total_steps = workflow.total_steps,
                    "Activity recorded"
                );
                if should_analyze(&workflow, Utc::now()) {
                    self.queue.submit(workflow.id);
                }
                Some(workflow.id)
            }
            Err(e) => {
                error!(
                    user_id = %user_id,
                    session_id = %session_id,
                    kind = event.kind(),
                    error = %e,
                    "Failed to record activity"
                );
                None
            }
        }
    }

    async fn append_event(
        &self,
        user_id: &str,
        session_id: &str,
        event: &ActivityEvent,
    ) -> RepositoryResult<Workflow> {
        let lock = self.session_lock(user_id, session_id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let existing = self
            .repository
            .find_active_workflow(user_id, session_id)
            .await?;
        let workflow = match existing {
            Some(workflow) => workflow,
            None => {
                let workflow = Workflow::new(user_id, session_id, classify(event.label()), now);
                self.repository.create_workflow(&workflow).await?;
                info!(
                    workflow_id = %workflow.id,
                    user_id = %user_id,
                    workflow_type = %workflow.workflow_type,
                    "Started workflow"
                );
                workflow
            }
        };

        match event {
            ActivityEvent::Command {
                command: text,
                model_used,
                duration_ms,
                success,
            }
            | ActivityEvent::ChatMessage {
                message: text,
                model_used,
                duration_ms,
                success,
            } => {
                let command = Command {
                    command: text.clone(),
                    timestamp: now,
                    model_used: model_used.clone(),
                    duration_ms: *duration_ms,
                    success: *success,
                };
                self.repository.append_command(&workflow.id, &command).await
            }
            ActivityEvent::ModelSwitch {
                from_model,
                to_model,
                reason,
            } => {
                let switch = ModelSwitch {
                    from_model: from_model.clone(),
                    to_model: to_model.clone(),
                    reason: reason.clone(),
                    timestamp: now,
                };
                self.repository
                    .append_model_switch(&workflow.id, &switch)
                    .await
            }
            ActivityEvent::SessionStart | ActivityEvent::SessionEnd | ActivityEvent::Other => {
                self.repository.touch_workflow(&workflow.id, now).await
            }
        }
    }

    /// Mark a workflow completed; the next event for its session starts a new one
    pub async fn complete_workflow(&self, workflow_id: Uuid) -> CoachResult<()> {
        let workflow = self
            .repository
            .get_workflow(&workflow_id)
            .await?
            .ok_or(CoachError::WorkflowNotFound(workflow_id))?;

        let lock = self.session_lock(&workflow.user_id, &workflow.session_id);
        {
            let _guard = lock.lock().await;
            if !self.repository.complete_workflow(&workflow_id, Utc::now()).await? {
                return Err(CoachError::WorkflowNotFound(workflow_id));
            }
        }
        drop(lock);
        self.release_session_lock(&workflow.user_id, &workflow.session_id);

        info!(workflow_id = %workflow_id, "Completed workflow");
        Ok(())
    }

    fn session_lock(&self, user_id: &str, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.session_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry((user_id.to_string(), session_id.to_string()))
            .or_default()
            .clone()
    }

    fn release_session_lock(&self, user_id: &str, session_id: &str) {
        let mut locks = self.session_locks.lock().unwrap_or_else(|e| e.into_inner());
        let key = (user_id.to_string(), session_id.to_string());
        // Only drop the entry if no recorder is holding or waiting on it
        let unused = locks
            .get(&key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if unused {
            locks.remove(&key);
        }
    }

    #[cfg(test)]
    fn tracked_sessions(&self) -> usize {
        self.session_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// Trigger policy: every fifth step, or when the last analysis is stale
pub fn should_analyze(workflow: &Workflow, now: DateTime<Utc>) -> bool {
    if workflow.total_steps % ANALYSIS_STEP_INTERVAL == 0 {
        return true;
    }
    match workflow.last_analyzed_at {
        Some(at) => now - at > Duration::minutes(ANALYSIS_MAX_AGE_MINUTES),
        None => true,
    }
}
