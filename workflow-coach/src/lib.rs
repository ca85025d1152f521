//! Workflow coaching engine
//!
//! Observes user activity, groups it into workflows, analyzes each workflow
//! for efficiency, and turns the analysis into coaching insights that a
//! consumer can list, mark shown and rate.
//!
//! Most hosts only need [`CoachService`]; the individual components are
//! public for embedding and testing.

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod database;
pub mod error;
pub mod insights;
pub mod lifecycle;
pub mod queue;
pub mod service;
pub mod stats;
pub mod tracker;

pub use analysis::{analyze, analyze_with, ModelCatalog};
pub use classifier::classify;
pub use config::CoachConfig;
pub use database::Database;
pub use error::{CoachError, CoachResult};
pub use insights::{AugmentationConfig, HttpInsightAugmenter, InsightSynthesizer};
pub use lifecycle::InsightLifecycle;
pub use queue::AnalysisQueue;
pub use service::{AnalysisOutcome, AnalysisPipeline, CoachService};
pub use stats::{Trend, UserStats, WorkflowStatsAggregator};
pub use tracker::WorkflowStateTracker;
