//! HTTP client for the optional insight augmentation service

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use workflow_coach_sdk::{async_trait, InsightAugmenter};

/// Augmentation service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "claude-3-5-sonnet".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

impl AugmentationConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Error, Debug)]
pub enum AugmentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned status {0}")]
    Status(u16),

    #[error("Service returned an empty response")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct AugmentRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Augmenter posting `{model, prompt}` to an HTTP endpoint
pub struct HttpInsightAugmenter {
    config: AugmentationConfig,
    client: reqwest::Client,
}

impl HttpInsightAugmenter {
    pub fn new(config: AugmentationConfig) -> Result<Self, AugmentError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { config, client })
    }

    async fn request(&self, summary: &str) -> Result<String, AugmentError> {
        let mut request = self.client.post(&self.config.endpoint).json(&AugmentRequest {
            model: &self.config.model,
            prompt: summary,
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AugmentError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "Augmentation response received");
        let text = response_text(&body);
        if text.trim().is_empty() {
            return Err(AugmentError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl InsightAugmenter for HttpInsightAugmenter {
    async fn augment(
        &self,
        summary: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.request(summary).await?)
    }
}

/// Unwrap a JSON envelope (`content`/`text`/`response`) or return the raw body
fn response_text(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["content", "text", "response"] {
            if let Some(text) = map.get(field).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    body.to_string()
}
