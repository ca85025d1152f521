//! Insight lifecycle: storage, retrieval, display and feedback

use crate::error::{CoachError, CoachResult};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use workflow_coach_sdk::{CoachInsight, Feedback, StoredInsight, WorkflowRepository};

/// Days an insight stays eligible for display
pub const INSIGHT_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct InsightLifecycle {
    repository: Arc<dyn WorkflowRepository>,
}

impl InsightLifecycle {
    pub fn new(repository: Arc<dyn WorkflowRepository>) -> Self {
        Self { repository }
    }

    /// Persist freshly synthesized insights with a seven day expiry
    pub async fn store(
        &self,
        user_id: &str,
        workflow_id: Uuid,
        insights: Vec<CoachInsight>,
    ) -> CoachResult<Vec<StoredInsight>> {
        let now = Utc::now();
        let mut stored = Vec::with_capacity(insights.len());

        for insight in insights {
            let record = StoredInsight {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                workflow_id,
                insight,
                created_at: now,
                expires_at: now + Duration::days(INSIGHT_TTL_DAYS),
                was_shown: false,
                shown_at: None,
                user_feedback: None,
                feedback_details: None,
                was_acted_upon: false,
            };
            self.repository.insert_insight(&record).await?;
            stored.push(record);
        }

        debug!(workflow_id = %workflow_id, count = stored.len(), "Stored insights");
        Ok(stored)
    }

    /// Unshown, unexpired insights, highest priority and newest first
    pub async fn list_pending(
        &self,
        user_id: &str,
        limit: usize,
    ) -> CoachResult<Vec<StoredInsight>> {
        Ok(self
            .repository
            .list_pending_insights(user_id, Utc::now(), limit)
            .await?)
    }

    pub async fn mark_shown(&self, insight_id: Uuid) -> CoachResult<()> {
        if !self.repository.mark_insight_shown(&insight_id, Utc::now()).await? {
            return Err(CoachError::InsightNotFound(insight_id));
        }
        Ok(())
    }

    /// Record user feedback; positive feedback counts as acted upon
    pub async fn record_feedback(
        &self,
        insight_id: Uuid,
        feedback: Feedback,
        details: Option<&str>,
    ) -> CoachResult<()> {
        let acted_upon = feedback == Feedback::Positive;
        let updated = self
            .repository
            .record_insight_feedback(&insight_id, feedback, details, acted_upon)
            .await?;
        if !updated {
            return Err(CoachError::InsightNotFound(insight_id));
        }

        info!(insight_id = %insight_id, feedback = feedback.as_str(), "Recorded insight feedback");
        Ok(())
    }

    /// Delete expired insights, returning how many were removed
    pub async fn purge_expired(&self) -> CoachResult<usize> {
        let deleted = self.repository.delete_expired_insights(Utc::now()).await?;
        if deleted > 0 {
            info!(count = deleted, "Purged expired insights");
        }
        Ok(deleted)
    }
}
