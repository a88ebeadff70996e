//! Deployment status and result models

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
    /// Created, not yet validated
    Pending,

    /// Artifacts, dependencies and build commands
    Building,

    /// Handed to the provider
    Deploying,

    Success,

    Failed,

    Cancelled,
}

impl DeploymentState {
    /// No further transitions happen from a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentState::Success | DeploymentState::Failed | DeploymentState::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentState::Pending => "pending",
            DeploymentState::Building => "building",
            DeploymentState::Deploying => "deploying",
            DeploymentState::Success => "success",
            DeploymentState::Failed => "failed",
            DeploymentState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live view of one deployment, mutated by the pipeline that owns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    pub deployment_id: String,

    pub status: DeploymentState,

    /// 0-100, never decreases
    pub progress: u8,

    pub current_step: String,

    pub logs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,

    pub build_time_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
}

impl DeploymentStatus {
    pub fn new(deployment_id: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            status: DeploymentState::Pending,
            progress: 0,
            current_step: "Initializing deployment".to_string(),
            logs: Vec::new(),
            error: None,
            url: None,
            preview_url: None,
            build_time_ms: 0,
            deployed_at: None,
        }
    }

    /// Raise progress to `progress`; lower values are ignored
    pub fn advance(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }
}

/// Immutable outcome of a finished pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub success: bool,

    pub deployment_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Error taxonomy name, e.g. `ValidationError`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    pub logs: Vec<String>,

    pub build_time_ms: u64,

    /// Bytes
    pub deployment_size: u64,

    pub status: DeploymentState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl DeploymentResult {
    /// Unsuccessful result carrying the logs gathered so far
    pub fn unsuccessful(
        status: &DeploymentStatus,
        error: impl Into<String>,
        error_kind: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            deployment_id: status.deployment_id.clone(),
            url: None,
            preview_url: None,
            error: Some(error.into()),
            error_kind: Some(error_kind.into()),
            logs: status.logs.clone(),
            build_time_ms: status.build_time_ms,
            deployment_size: 0,
            status: status.status,
            deployed_at: None,
            metadata: BTreeMap::new(),
        }
    }
}
