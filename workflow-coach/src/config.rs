//! Coach configuration: YAML file plus environment overrides

use crate::analysis::ModelCatalog;
use crate::error::{CoachError, CoachResult};
use crate::insights::AugmentationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_DATABASE: &str = "WORKFLOW_COACH_DB";
pub const ENV_AUGMENT_URL: &str = "WORKFLOW_COACH_AUGMENT_URL";
pub const ENV_AUGMENT_KEY: &str = "WORKFLOW_COACH_AUGMENT_KEY";
pub const ENV_AUGMENT_MODEL: &str = "WORKFLOW_COACH_AUGMENT_MODEL";
pub const ENV_AUGMENT_TIMEOUT: &str = "WORKFLOW_COACH_AUGMENT_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    pub database_path: PathBuf,
    /// Bounded capacity of the background analysis queue
    pub analysis_queue_capacity: usize,
    pub models: ModelCatalog,
    /// Unset disables insight augmentation
    pub augmentation: Option<AugmentationConfig>,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            analysis_queue_capacity: 256,
            models: ModelCatalog::default(),
            augmentation: None,
        }
    }
}

/// Get the default path of the coach database
pub fn default_database_path() -> PathBuf {
    use directories::ProjectDirs;

    if let Some(proj_dirs) = ProjectDirs::from("com", "workflow-coach", "workflow-coach") {
        proj_dirs.data_dir().join("coach.db")
    } else {
        PathBuf::from(".workflow-coach.db")
    }
}

impl CoachConfig {
    /// Load from an optional YAML file, then apply `.env` and process environment
    pub fn load(path: Option<&Path>) -> CoachResult<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                let config = Self::from_yaml(&content)?;
                debug!(path = %path.display(), "Loaded coach config");
                config
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> CoachResult<Self> {
        serde_yaml::from_str(content).map_err(|e| CoachError::Config(e.to_string()))
    }

    /// Override fields from variables resolved through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> CoachResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DATABASE) {
            self.database_path = PathBuf::from(db);
        }

        if let Some(url) = lookup(ENV_AUGMENT_URL) {
            match &mut self.augmentation {
                Some(aug) => aug.endpoint = url,
                None => self.augmentation = Some(AugmentationConfig::new(url)),
            }
        }

        // The remaining overrides only refine an already configured endpoint
        if let Some(aug) = &mut self.augmentation {
            if let Some(key) = lookup(ENV_AUGMENT_KEY) {
                aug.api_key = Some(key);
            }
            if let Some(model) = lookup(ENV_AUGMENT_MODEL) {
                aug.model = model;
            }
            if let Some(secs) = lookup(ENV_AUGMENT_TIMEOUT) {
                aug.timeout_secs = secs.trim().parse().map_err(|_| {
                    CoachError::Config(format!(
                        "{} must be a number of seconds, got '{}'",
                        ENV_AUGMENT_TIMEOUT, secs
                    ))
                })?;
            }
        }

        Ok(())
    }
}
