//! Deployment configuration models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Target environment of a deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Staging => f.write_str("staging"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// Reference to a provider, either by id or as an inline record.
///
/// Only the id is ever read; the catalog is the source of truth for
/// capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderRef {
    Id(String),
    Inline { id: String },
}

impl ProviderRef {
    pub fn id(&self) -> &str {
        match self {
            ProviderRef::Id(id) => id,
            ProviderRef::Inline { id } => id,
        }
    }
}

impl From<&str> for ProviderRef {
    fn from(id: &str) -> Self {
        ProviderRef::Id(id.to_string())
    }
}

/// Resource limits requested for the running application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scale: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,

    /// e.g. `512MB`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,

    /// Request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

/// Notification channels to inform after a successful deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notifications {
    #[serde(default)]
    pub email: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
}

/// User-supplied parameters for one deployment attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub provider: ProviderRef,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,

    #[serde(default)]
    pub regions: Vec<String>,

    #[serde(flatten)]
    pub resources: ResourceLimits,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_path: Option<String>,

    #[serde(default)]
    pub analytics_enabled: bool,

    /// Retry preference for callers; the engine itself never retries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Notifications>,
}

impl DeploymentConfig {
    /// Minimal configuration targeting `provider_id`
    pub fn for_provider(provider_id: &str) -> Self {
        Self {
            provider: ProviderRef::from(provider_id),
            environment: Environment::default(),
            environment_variables: BTreeMap::new(),
            custom_domain: None,
            build_command: None,
            output_directory: None,
            node_version: None,
            regions: Vec::new(),
            resources: ResourceLimits::default(),
            health_check_path: None,
            analytics_enabled: false,
            max_retries: None,
            webhook_url: None,
            notifications: None,
        }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Node version with the `18.x` default applied
    pub fn node_version_or_default(&self) -> &str {
        self.node_version.as_deref().unwrap_or("18.x")
    }
}
