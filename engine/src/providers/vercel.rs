//! Vercel driver: submit a deployment, then poll it until ready

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use deploy_models::{Environment, ProviderKind};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::EngineError;
use crate::http::client::HttpClient;
use crate::providers::credentials::{require, Credentials};
use crate::providers::{
    https_url, str_field, timestamp, DeploymentRequest, PollOutcome, ProviderDriver,
    ProviderHandle, ProviderOutcome, Submission,
};

pub const PROVIDER_ID: &str = "vercel";
const DEFAULT_REGION: &str = "iad1";

pub struct VercelDriver {
    client: HttpClient,
    credentials: Credentials,
}

impl VercelDriver {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            client: HttpClient::new("Vercel", base_url, timeout)?,
            credentials,
        })
    }

    fn payload(request: &DeploymentRequest<'_>) -> Value {
        let config = request.config;

        let files: Vec<Value> = request
            .artifacts
            .iter()
            .map(|(path, content)| {
                json!({
                    "file": path,
                    "data": BASE64.encode(content),
                    "encoding": "base64",
                })
            })
            .collect();

        let env: Vec<Value> = config
            .environment_variables
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value, "type": "encrypted" }))
            .collect();

        let regions = if config.regions.is_empty() {
            vec![DEFAULT_REGION.to_string()]
        } else {
            config.regions.clone()
        };

        let mut payload = json!({
            "name": request.app_name(),
            "files": files,
            "projectSettings": {
                "framework": request.fragment.template.vercel_framework(),
                "buildCommand": config.build_command,
                "outputDirectory": config.output_directory,
                "nodeVersion": config.node_version_or_default(),
            },
            "env": env,
            "regions": regions,
        });

        if config.environment == Environment::Production {
            payload["target"] = json!("production");
        }
        if request.provider.kind == ProviderKind::Serverless {
            payload["functions"] = json!({});
        }
        payload
    }

    fn outcome(status: &Value, handle: &ProviderHandle, success: bool) -> ProviderOutcome {
        let mut metadata = handle.metadata.clone();
        metadata.insert("provider".to_string(), json!("Vercel"));
        metadata.insert(
            "region".to_string(),
            status
                .pointer("/regions/0")
                .cloned()
                .unwrap_or_else(|| json!(DEFAULT_REGION)),
        );
        metadata.insert("vercelId".to_string(), json!(handle.id));

        ProviderOutcome {
            success,
            state: str_field(status, "/readyState").unwrap_or_default(),
            url: str_field(status, "/url").map(|u| https_url(&u)),
            preview_url: str_field(status, "/alias/0").map(|u| https_url(&u)),
            deployment_size: status.get("size").and_then(Value::as_u64).unwrap_or(0),
            deployed_at: timestamp(status.get("ready").or_else(|| status.get("createdAt"))),
            metadata,
        }
    }
}

#[async_trait]
impl ProviderDriver for VercelDriver {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn submit(&self, request: &DeploymentRequest<'_>) -> Result<Submission, EngineError> {
        let token = require(&self.credentials.vercel_token, "VERCEL_TOKEN")?;

        let created: Value = self
            .client
            .post("/v13/deployments", token, &Self::payload(request))
            .await?;

        let id = str_field(&created, "/id").ok_or_else(|| EngineError::ProviderApi {
            provider: "Vercel".to_string(),
            status: 200,
            message: "deployment response has no id".to_string(),
        })?;
        info!("Vercel deployment {} created for {}", id, request.deployment_id);

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "nodeVersion".to_string(),
            json!(request.config.node_version_or_default()),
        );
        metadata.insert("framework".to_string(), json!(request.fragment.template));

        Ok(Submission::Pending(ProviderHandle { id, metadata }))
    }

    async fn poll(&self, handle: &ProviderHandle) -> Result<PollOutcome, EngineError> {
        let token = require(&self.credentials.vercel_token, "VERCEL_TOKEN")?;
        let status: Value = self
            .client
            .get(&format!("/v13/deployments/{}", handle.id), token)
            .await?;

        let state = str_field(&status, "/readyState").unwrap_or_default();
        Ok(match state.as_str() {
            "READY" => PollOutcome::Terminal(Self::outcome(&status, handle, true)),
            "ERROR" | "CANCELED" => PollOutcome::Terminal(Self::outcome(&status, handle, false)),
            _ => PollOutcome::InProgress(format!("Vercel deployment status: {}", state)),
        })
    }
}
