//! Error types for the coaching service

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoachError {
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error("Insight not found: {0}")]
    InsightNotFound(Uuid),

    #[error("Repository error: {0}")]
    Repository(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CoachResult<T> = Result<T, CoachError>;
