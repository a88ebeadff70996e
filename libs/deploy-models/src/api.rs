//! HTTP API envelopes

use serde::{Deserialize, Serialize};

use crate::config::DeploymentConfig;
use crate::deployment::DeploymentResult;
use crate::fragment::Fragment;
use crate::provider::DeploymentProvider;

fn default_true() -> bool {
    true
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Body of `POST /deployments`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub fragment: Fragment,
    pub config: DeploymentConfig,

    /// Block until the pipeline finishes; otherwise return the id at once
    #[serde(default = "default_true")]
    pub wait: bool,
}

/// Returned when a deployment is started without waiting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployAccepted {
    pub deployment_id: String,
}

/// Deployment history for one fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub deployments: Vec<DeploymentResult>,
}

/// Provider catalog listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderListResponse {
    pub providers: Vec<DeploymentProvider>,
}

/// Result of a cancel or rollback request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
