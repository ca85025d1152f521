//! Coaching service wiring
//!
//! [`CoachService`] is constructed explicitly from a repository, an optional
//! augmenter and a [`CoachConfig`]. It spawns a single background worker that
//! drains the analysis queue and runs the [`AnalysisPipeline`] for each
//! queued workflow: snapshot, analyze, persist the annotation, synthesize
//! insights and persist them. Repeated triggers for a workflow that is still
//! queued collapse into one run. Pipeline failures are logged by the worker and
//! never reach the recording path.

use crate::analysis::{self, ModelCatalog};
use crate::config::CoachConfig;
use crate::error::{CoachError, CoachResult};
use crate::insights::InsightSynthesizer;
use crate::lifecycle::InsightLifecycle;
use crate::queue::{AnalysisQueue, AnalysisReceiver};
use crate::stats::{UserStats, WorkflowStatsAggregator};
use crate::tracker::WorkflowStateTracker;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;
use workflow_coach_sdk::{
    ActivityEvent, Feedback, InsightAugmenter, StoredInsight, WorkflowAnalysis,
    WorkflowRepository,
};

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub workflow_id: Uuid,
    pub analysis: WorkflowAnalysis,
    pub insights: Vec<StoredInsight>,
}

/// Analyze a workflow snapshot and turn the result into stored insights
pub struct AnalysisPipeline {
    repository: Arc<dyn WorkflowRepository>,
    synthesizer: InsightSynthesizer,
    lifecycle: InsightLifecycle,
    models: ModelCatalog,
}

impl AnalysisPipeline {
    pub fn new(
        repository: Arc<dyn WorkflowRepository>,
        synthesizer: InsightSynthesizer,
        models: ModelCatalog,
    ) -> Self {
        Self {
            lifecycle: InsightLifecycle::new(repository.clone()),
            repository,
            synthesizer,
            models,
        }
    }

    pub async fn run(&self, workflow_id: Uuid) -> CoachResult<AnalysisOutcome> {
        let workflow = self
            .repository
            .get_workflow(&workflow_id)
            .await?
            .ok_or(CoachError::WorkflowNotFound(workflow_id))?;

        let analysis = analysis::analyze_with(&workflow, &self.models);
        self.repository
            .save_analysis(&workflow_id, &analysis, Utc::now())
            .await?;

        let patterns = self.repository.list_patterns(&workflow.user_id).await?;
        let insights = self
            .synthesizer
            .synthesize(&workflow.user_id, &analysis, &workflow, &patterns)
            .await;
        let insights = self
            .lifecycle
            .store(&workflow.user_id, workflow_id, insights)
            .await?;

        info!(
            workflow_id = %workflow_id,
            efficiency = analysis.efficiency_score,
            complexity = %analysis.complexity_assessment.level,
            insights = insights.len(),
            "Workflow analyzed"
        );

        Ok(AnalysisOutcome {
            workflow_id,
            analysis,
            insights,
        })
    }
}

pub struct CoachService {
    tracker: WorkflowStateTracker,
    pipeline: Arc<AnalysisPipeline>,
    lifecycle: InsightLifecycle,
    stats: WorkflowStatsAggregator,
    worker: JoinHandle<()>,
}

impl CoachService {
    /// Build the service and spawn its analysis worker
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        repository: Arc<dyn WorkflowRepository>,
        augmenter: Option<Arc<dyn InsightAugmenter>>,
        config: &CoachConfig,
    ) -> Self {
        let synthesizer = match augmenter {
            Some(augmenter) => {
                let timeout = config
                    .augmentation
                    .as_ref()
                    .map(|a| a.timeout())
                    .unwrap_or(Duration::from_secs(20));
                InsightSynthesizer::with_augmenter(augmenter, timeout)
            }
            None => InsightSynthesizer::new(),
        };

        let pipeline = Arc::new(AnalysisPipeline::new(
            repository.clone(),
            synthesizer,
            config.models.clone(),
        ));

        let (queue, rx) = AnalysisQueue::channel(config.analysis_queue_capacity);
        let worker = tokio::spawn(run_worker(pipeline.clone(), rx));

        Self {
            tracker: WorkflowStateTracker::new(repository.clone(), queue),
            lifecycle: InsightLifecycle::new(repository.clone()),
            stats: WorkflowStatsAggregator::new(repository),
            pipeline,
            worker,
        }
    }

    pub async fn record_activity(
        &self,
        user_id: &str,
        session_id: &str,
        event: ActivityEvent,
    ) -> Option<Uuid> {
        self.tracker
            .record_activity(user_id, session_id, event)
            .await
    }

    /// Run the analysis pipeline in the caller's task
    pub async fn analyze_now(&self, workflow_id: Uuid) -> CoachResult<AnalysisOutcome> {
        self.pipeline.run(workflow_id).await
    }

    pub async fn complete_workflow(&self, workflow_id: Uuid) -> CoachResult<()> {
        self.tracker.complete_workflow(workflow_id).await
    }

    pub async fn list_pending(
        &self,
        user_id: &str,
        limit: usize,
    ) -> CoachResult<Vec<StoredInsight>> {
        self.lifecycle.list_pending(user_id, limit).await
    }

    pub async fn mark_shown(&self, insight_id: Uuid) -> CoachResult<()> {
        self.lifecycle.mark_shown(insight_id).await
    }

    pub async fn record_feedback(
        &self,
        insight_id: Uuid,
        feedback: Feedback,
        details: Option<&str>,
    ) -> CoachResult<()> {
        self.lifecycle
            .record_feedback(insight_id, feedback, details)
            .await
    }

    pub async fn get_user_stats(&self, user_id: &str) -> CoachResult<UserStats> {
        self.stats.get_user_stats(user_id).await
    }

    pub async fn purge_expired(&self) -> CoachResult<usize> {
        self.lifecycle.purge_expired().await
    }

    /// Close the analysis queue and wait for queued analyses to finish
    pub async fn shutdown(self) {
        let CoachService { tracker, worker, .. } = self;
        drop(tracker);

        if let Err(e) = worker.await {
            error!(error = %e, "Analysis worker terminated abnormally");
        }
        debug!("Coach service stopped");
    }
}

async fn run_worker(pipeline: Arc<AnalysisPipeline>, mut rx: AnalysisReceiver) {
    while let Some(workflow_id) = rx.recv().await {
        if let Err(e) = pipeline.run(workflow_id).await {
            error!(workflow_id = %workflow_id, error = %e, "Background analysis failed");
        }
    }
    debug!("Analysis queue closed");
}
