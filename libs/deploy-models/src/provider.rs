//! Deployment provider models

use serde::{Deserialize, Serialize};

use crate::fragment::TemplateId;

/// Hosting model of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Static,
    Serverless,
    Container,
    Traditional,
}

/// A paid plan offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidPlan {
    pub name: String,
    /// Monthly price in USD
    pub price: u32,
    pub features: Vec<String>,
}

/// Pricing metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub free: bool,
    pub paid_plans: Vec<PaidPlan>,
}

/// Build limits of a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSettings {
    pub supported_node_versions: Vec<String>,
    pub supported_frameworks: Vec<String>,
    pub max_build_time_ms: u64,
    /// Bytes
    pub max_deployment_size: u64,
}

/// A third-party hosting platform and its capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentProvider {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub supported_templates: Vec<TemplateId>,
    pub features: Vec<String>,
    pub pricing: Pricing,
    pub regions: Vec<String>,
    pub build_settings: BuildSettings,
}

impl DeploymentProvider {
    pub fn supports(&self, template: TemplateId) -> bool {
        self.supported_templates.contains(&template)
    }
}
