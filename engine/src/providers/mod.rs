//! Provider drivers
//!
//! One driver per hosting provider, selected by provider id. Drivers translate
//! an artifact set into the provider's API calls and the provider's answers
//! back into a [`ProviderOutcome`].

pub mod credentials;
pub mod fly;
pub mod netlify;
pub mod poll;
pub mod railway;
pub mod render;
pub mod vercel;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deploy_models::{DeploymentConfig, DeploymentProvider, Fragment};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deploy::artifacts::ArtifactSet;
use crate::errors::EngineError;
use crate::utils::slugify;

pub use credentials::Credentials;
pub use poll::{wait_for_terminal, PollSettings};

/// Everything a driver needs to submit a deployment
pub struct DeploymentRequest<'a> {
    pub deployment_id: &'a str,
    pub fragment: &'a Fragment,
    pub config: &'a DeploymentConfig,
    pub provider: &'a DeploymentProvider,
    pub artifacts: &'a ArtifactSet,
}

impl DeploymentRequest<'_> {
    /// Provider-side application name
    pub fn app_name(&self) -> String {
        slugify(&self.fragment.title)
    }
}

/// Provider-side reference to a submitted deployment
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderHandle {
    pub id: String,
    pub metadata: BTreeMap<String, Value>,
}

/// Terminal state reported by a provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOutcome {
    pub success: bool,

    /// Native provider state, e.g. `READY`
    pub state: String,

    pub url: Option<String>,
    pub preview_url: Option<String>,
    pub deployment_size: u64,
    pub deployed_at: Option<DateTime<Utc>>,
    pub metadata: BTreeMap<String, Value>,
}

impl ProviderOutcome {
    /// Outcome of a provider where a 2xx answer is the confirmation
    pub fn confirmed(url: String, metadata: BTreeMap<String, Value>) -> Self {
        Self {
            success: true,
            state: "created".to_string(),
            url: Some(url),
            preview_url: None,
            deployment_size: 0,
            deployed_at: Some(Utc::now()),
            metadata,
        }
    }
}

/// Result of a submit call
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Accepted; the deployment must be polled to completion
    Pending(ProviderHandle),

    /// The submit response itself confirms the deployment
    Completed(ProviderOutcome),
}

/// Result of one poll call
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    InProgress(String),
    Terminal(ProviderOutcome),
}

/// Hosting provider API driver
#[async_trait]
pub trait ProviderDriver: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Submit the deployment: one create/deploy exchange with the provider
    async fn submit(&self, request: &DeploymentRequest<'_>) -> Result<Submission, EngineError>;

    /// Check a pending deployment once
    async fn poll(&self, handle: &ProviderHandle) -> Result<PollOutcome, EngineError> {
        Err(EngineError::Internal(format!(
            "{} deployments are not polled (handle {})",
            self.provider_id(),
            handle.id
        )))
    }
}

/// Base URLs of the provider APIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub vercel: String,
    pub netlify: String,
    pub railway: String,
    pub render: String,
    pub fly: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            vercel: "https://api.vercel.com".to_string(),
            netlify: "https://api.netlify.com".to_string(),
            railway: "https://backboard.railway.app".to_string(),
            render: "https://api.render.com".to_string(),
            fly: "https://api.fly.io".to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Every provider served from the same base URL
    pub fn uniform(base_url: &str) -> Self {
        Self {
            vercel: base_url.to_string(),
            netlify: base_url.to_string(),
            railway: base_url.to_string(),
            render: base_url.to_string(),
            fly: base_url.to_string(),
        }
    }
}

/// Drivers keyed by provider id
#[derive(Default, Clone)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn ProviderDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drivers for the five built-in providers
    pub fn builtin(
        endpoints: &ProviderEndpoints,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let mut registry = Self::new();
        registry.register(Arc::new(vercel::VercelDriver::new(
            &endpoints.vercel,
            credentials.clone(),
            timeout,
        )?));
        registry.register(Arc::new(netlify::NetlifyDriver::new(
            &endpoints.netlify,
            credentials.clone(),
            timeout,
        )?));
        registry.register(Arc::new(railway::RailwayDriver::new(
            &endpoints.railway,
            credentials.clone(),
            timeout,
        )?));
        registry.register(Arc::new(render::RenderDriver::new(
            &endpoints.render,
            credentials.clone(),
            timeout,
        )?));
        registry.register(Arc::new(fly::FlyDriver::new(
            &endpoints.fly,
            credentials.clone(),
            timeout,
        )?));
        Ok(registry)
    }

    /// Register a driver, replacing any driver for the same provider
    pub fn register(&mut self, driver: Arc<dyn ProviderDriver>) {
        self.drivers.insert(driver.provider_id().to_string(), driver);
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn ProviderDriver>> {
        self.drivers.get(provider_id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.drivers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Read a string field out of a JSON response
pub(crate) fn str_field(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

/// Prefix scheme-less URLs with `https://`
pub(crate) fn https_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Parse an RFC 3339 or epoch-millis timestamp
pub(crate) fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
        _ => None,
    }
}
