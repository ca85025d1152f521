//! Bounded analysis queue that coalesces requests per workflow
//!
//! A workflow id is queued at most once at a time. The id is released when
//! the worker takes it off the queue, before it reads the workflow snapshot,
//! so every event appended after that point queues a fresh analysis while
//! events appended before it are covered by the run in progress.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

type QueuedSet = Arc<Mutex<HashSet<Uuid>>>;

fn lock(queued: &QueuedSet) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
    queued.lock().unwrap_or_else(|e| e.into_inner())
}

/// Sending half, owned by the tracker
pub struct AnalysisQueue {
    tx: mpsc::Sender<Uuid>,
    queued: QueuedSet,
}

/// Receiving half, drained by the analysis worker
pub struct AnalysisReceiver {
    rx: mpsc::Receiver<Uuid>,
    queued: QueuedSet,
}

impl AnalysisQueue {
    pub fn channel(capacity: usize) -> (AnalysisQueue, AnalysisReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queued: QueuedSet = Arc::default();
        (
            AnalysisQueue {
                tx,
                queued: queued.clone(),
            },
            AnalysisReceiver { rx, queued },
        )
    }

    /// Queue a workflow without waiting; returns whether a new entry was queued
    pub fn submit(&self, workflow_id: Uuid) -> bool {
        if !lock(&self.queued).insert(workflow_id) {
            debug!(workflow_id = %workflow_id, "Analysis already queued");
            return false;
        }

        match self.tx.try_send(workflow_id) {
            Ok(()) => {
                debug!(workflow_id = %workflow_id, "Analysis queued");
                true
            }
            Err(e) => {
                lock(&self.queued).remove(&workflow_id);
                let reason = match e {
                    TrySendError::Full(_) => "full",
                    TrySendError::Closed(_) => "closed",
                };
                warn!(
                    workflow_id = %workflow_id,
                    reason,
                    "Analysis queue unavailable, skipping analysis"
                );
                false
            }
        }
    }
}

impl AnalysisReceiver {
    /// Next workflow to analyze; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Uuid> {
        let workflow_id = self.rx.recv().await?;
        lock(&self.queued).remove(&workflow_id);
        Some(workflow_id)
    }

    pub fn try_recv(&mut self) -> Option<Uuid> {
        let workflow_id = self.rx.try_recv().ok()?;
        lock(&self.queued).remove(&workflow_id);
        Some(workflow_id)
    }
}
