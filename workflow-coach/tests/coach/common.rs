//! Common test utilities for coach tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use workflow_coach::{CoachConfig, CoachService, Database};
use workflow_coach_sdk::{
    async_trait, ActivityEvent, Command, InsightAugmenter, Workflow, WorkflowType,
};

/// Fixed start time for hand-built workflows
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

/// Build a command `offset_sec` after [`start_time`]
pub fn command(name: &str, offset_sec: i64, duration_ms: Option<u64>, success: bool) -> Command {
    Command {
        command: name.to_string(),
        timestamp: start_time() + Duration::seconds(offset_sec),
        model_used: None,
        duration_ms,
        success,
    }
}

/// Workflow with the given commands and `total_steps` kept in sync
pub fn workflow_with(workflow_type: WorkflowType, commands: Vec<Command>) -> Workflow {
    let mut wf = Workflow::new("user-1", "session-1", workflow_type, start_time());
    wf.total_steps = commands.len();
    wf.command_sequence = commands;
    wf
}

pub fn command_event(text: &str) -> ActivityEvent {
    ActivityEvent::Command {
        command: text.to_string(),
        model_used: Some("gpt-4o".to_string()),
        duration_ms: Some(1000),
        success: true,
    }
}

pub fn failed_event(text: &str, model: &str) -> ActivityEvent {
    ActivityEvent::Command {
        command: text.to_string(),
        model_used: Some(model.to_string()),
        duration_ms: Some(1000),
        success: false,
    }
}

pub fn test_config() -> CoachConfig {
    CoachConfig {
        database_path: ":memory:".into(),
        ..CoachConfig::default()
    }
}

/// Service over a fresh in-memory database
pub fn service_with(augmenter: Option<Arc<dyn InsightAugmenter>>) -> (CoachService, Arc<Database>) {
    let db = Arc::new(Database::new_in_memory().unwrap());
    let service = CoachService::new(db.clone(), augmenter, &test_config());
    (service, db)
}

/// Augmenter returning a canned response and counting calls
pub struct FakeAugmenter {
    response: Result<String, String>,
    pub calls: AtomicUsize,
}

impl FakeAugmenter {
    pub fn responding(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InsightAugmenter for FakeAugmenter {
    async fn augment(
        &self,
        _summary: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(message.clone().into()),
        }
    }
}

pub const AUGMENTED_RESPONSE: &str = r#"Here is my advice:
```json
[
  {
    "type": "strategic_advice",
    "category": "strategic",
    "title": "Batch related edits",
    "description": "Group small edits before running the test suite.",
    "recommendations": [
      {"action": "Collect edits, then run tests once", "expected_improvement": "Fewer test runs", "difficulty": "easy"}
    ],
    "priority": "urgent"
  }
]
```"#;
