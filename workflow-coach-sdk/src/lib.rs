//! Shared data model and collaborator contracts for workflow-coach
//!
//! Everything a host needs to plug the coaching engine into its own storage
//! and insight service lives here:
//!
//! - **Data model**: [`Workflow`], [`Command`], [`ModelSwitch`],
//!   [`WorkflowAnalysis`], [`CoachInsight`], [`StoredInsight`], [`WorkflowPattern`]
//! - **Ingress payloads**: [`ActivityEvent`], a closed tagged variant per activity type
//! - **Collaborators**: [`WorkflowRepository`] and [`InsightAugmenter`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// Re-export async trait for implementors
pub use async_trait::async_trait;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Dominant activity of a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Coding,
    Analysis,
    Writing,
    Research,
    Refactoring,
    General,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::Coding => "coding",
            WorkflowType::Analysis => "analysis",
            WorkflowType::Writing => "writing",
            WorkflowType::Research => "research",
            WorkflowType::Refactoring => "refactoring",
            WorkflowType::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "coding" => Some(WorkflowType::Coding),
            "analysis" => Some(WorkflowType::Analysis),
            "writing" => Some(WorkflowType::Writing),
            "research" => Some(WorkflowType::Research),
            "refactoring" => Some(WorkflowType::Refactoring),
            "general" => Some(WorkflowType::General),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Active,
    Completed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Active => "active",
            WorkflowStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(WorkflowStatus::Active),
            "completed" => Some(WorkflowStatus::Completed),
            _ => None,
        }
    }
}

/// One discrete user/system action within a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub command: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub success: bool,
}

/// A change of model within a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSwitch {
    pub from_model: String,
    pub to_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A bounded sequence of user actions within one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub workflow_type: WorkflowType,
    pub status: WorkflowStatus,
    pub command_sequence: Vec<Command>,
    pub model_switch_patterns: Vec<ModelSwitch>,
    pub total_steps: usize,
    pub efficiency_score: Option<u8>,
    pub complexity_level: Option<ComplexityLevel>,
    /// Latest embedded analysis
    pub analysis: Option<WorkflowAnalysis>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Workflow {
    /// Create a fresh active workflow with empty sequences
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        workflow_type: WorkflowType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            workflow_type,
            status: WorkflowStatus::Active,
            command_sequence: Vec::new(),
            model_switch_patterns: Vec::new(),
            total_steps: 0,
            efficiency_score: None,
            complexity_level: None,
            analysis: None,
            last_analyzed_at: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    Expert,
}

impl ComplexityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLevel::Simple => "simple",
            ComplexityLevel::Moderate => "moderate",
            ComplexityLevel::Complex => "complex",
            ComplexityLevel::Expert => "expert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(ComplexityLevel::Simple),
            "moderate" => Some(ComplexityLevel::Moderate),
            "complex" => Some(ComplexityLevel::Complex),
            "expert" => Some(ComplexityLevel::Expert),
            _ => None,
        }
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested model change for a poorly performing model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecommendation {
    pub current_model: String,
    pub recommended_model: String,
    pub reason: String,
    pub expected_improvement_pct: u32,
}

/// Time breakdown of a workflow, in whole seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAnalysis {
    pub total_time_sec: u64,
    pub active_time_sec: u64,
    pub idle_time_sec: u64,
    pub avg_step_time_sec: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityAssessment {
    pub level: ComplexityLevel,
    pub factors: Vec<String>,
}

/// Derived analysis of a workflow snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowAnalysis {
    pub workflow_type: WorkflowType,
    pub efficiency_score: u8,
    pub bottlenecks: Vec<String>,
    pub optimizations: Vec<String>,
    pub model_recommendations: Vec<ModelRecommendation>,
    pub time_analysis: TimeAnalysis,
    pub complexity_assessment: ComplexityAssessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    EfficiencyImprovement,
    ModelOptimization,
    BottleneckResolution,
    ComplexityManagement,
    PatternRecognition,
    /// Free-form advice from the augmentation service
    #[serde(other)]
    StrategicAdvice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Strategic,
    Tactical,
    Operational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Ordering rank used for retrieval (higher first)
    pub fn rank(&self) -> i64 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecommendation {
    pub action: String,
    pub expected_improvement: String,
    pub difficulty: Difficulty,
}

/// Synthesized, user-facing coaching content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachInsight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub category: InsightCategory,
    pub title: String,
    pub description: String,
    pub recommendations: Vec<InsightRecommendation>,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Positive,
    Negative,
    Neutral,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Positive => "positive",
            Feedback::Negative => "negative",
            Feedback::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Feedback::Positive),
            "negative" => Some(Feedback::Negative),
            "neutral" => Some(Feedback::Neutral),
            _ => None,
        }
    }
}

/// A persisted insight with its lifecycle state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInsight {
    pub id: Uuid,
    pub user_id: String,
    pub workflow_id: Uuid,
    #[serde(flatten)]
    pub insight: CoachInsight,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub was_shown: bool,
    pub shown_at: Option<DateTime<Utc>>,
    pub user_feedback: Option<Feedback>,
    pub feedback_details: Option<String>,
    pub was_acted_upon: bool,
}

/// Historical behaviour pattern observed for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPattern {
    pub user_id: String,
    pub pattern_name: String,
    pub frequency: u32,
}

fn default_success() -> bool {
    true
}

/// Activity delivered by the ingress, one variant per activity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEvent {
    Command {
        command: String,
        #[serde(default)]
        model_used: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
        #[serde(default = "default_success")]
        success: bool,
    },
    ChatMessage {
        message: String,
        #[serde(default)]
        model_used: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
        #[serde(default = "default_success")]
        success: bool,
    },
    ModelSwitch {
        from_model: String,
        to_model: String,
        #[serde(default)]
        reason: Option<String>,
    },
    SessionStart,
    SessionEnd,
    #[serde(other)]
    Other,
}

impl ActivityEvent {
    /// Activity type name as delivered on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            ActivityEvent::Command { .. } => "command",
            ActivityEvent::ChatMessage { .. } => "chat_message",
            ActivityEvent::ModelSwitch { .. } => "model_switch",
            ActivityEvent::SessionStart => "session_start",
            ActivityEvent::SessionEnd => "session_end",
            ActivityEvent::Other => "other",
        }
    }

    /// Text used to classify a workflow created by this event
    pub fn label(&self) -> &str {
        match self {
            ActivityEvent::Command { command, .. } => command,
            ActivityEvent::ChatMessage { message, .. } => message,
            other => other.kind(),
        }
    }
}

/// Durable store for workflows, insights and patterns
///
/// Appends must be atomic per workflow: a concurrent append on the same
/// workflow never loses an element.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Find the active workflow for a (user, session) pair
    async fn find_active_workflow(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> RepositoryResult<Option<Workflow>>;

    async fn create_workflow(&self, workflow: &Workflow) -> RepositoryResult<()>;

    async fn get_workflow(&self, id: &Uuid) -> RepositoryResult<Option<Workflow>>;

    /// Append a command and return the updated workflow
    async fn append_command(&self, id: &Uuid, command: &Command) -> RepositoryResult<Workflow>;

    /// Append a model switch and return the updated workflow
    async fn append_model_switch(
        &self,
        id: &Uuid,
        switch: &ModelSwitch,
    ) -> RepositoryResult<Workflow>;

    /// Bump `updated_at` and return the workflow
    async fn touch_workflow(&self, id: &Uuid, at: DateTime<Utc>) -> RepositoryResult<Workflow>;

    /// Annotate a workflow with its latest analysis
    async fn save_analysis(
        &self,
        id: &Uuid,
        analysis: &WorkflowAnalysis,
        analyzed_at: DateTime<Utc>,
    ) -> RepositoryResult<()>;

    /// Mark a workflow completed; returns false when it does not exist
    async fn complete_workflow(&self, id: &Uuid, at: DateTime<Utc>) -> RepositoryResult<bool>;

    /// Most recent workflows of a user, newest first
    async fn list_user_workflows(&self, user_id: &str, limit: usize)
        -> RepositoryResult<Vec<Workflow>>;

    async fn list_patterns(&self, user_id: &str) -> RepositoryResult<Vec<WorkflowPattern>>;

    async fn insert_insight(&self, insight: &StoredInsight) -> RepositoryResult<()>;

    async fn get_insight(&self, id: &Uuid) -> RepositoryResult<Option<StoredInsight>>;

    /// Unshown, unexpired insights ordered by priority then recency
    async fn list_pending_insights(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Vec<StoredInsight>>;

    /// Returns false when the insight does not exist
    async fn mark_insight_shown(&self, id: &Uuid, at: DateTime<Utc>) -> RepositoryResult<bool>;

    /// Returns false when the insight does not exist
    async fn record_insight_feedback(
        &self,
        id: &Uuid,
        feedback: Feedback,
        details: Option<&str>,
        acted_upon: bool,
    ) -> RepositoryResult<bool>;

    /// Delete insights that expired before `now`
    async fn delete_expired_insights(&self, now: DateTime<Utc>) -> RepositoryResult<usize>;
}

/// Optional external service supplementing rule-based insights
#[async_trait]
pub trait InsightAugmenter: Send + Sync {
    /// Send a natural-language summary and return the raw response text
    async fn augment(
        &self,
        summary: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}
