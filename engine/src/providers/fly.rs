//! Fly.io driver: app creation followed by a deploy call.
//!
//! Fly.io deployments are not polled: a 2xx answer to the deploy call is the
//! confirmation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::EngineError;
use crate::http::client::HttpClient;
use crate::providers::credentials::{require, Credentials};
use crate::providers::{str_field, DeploymentRequest, ProviderDriver, ProviderOutcome, Submission};

pub const PROVIDER_ID: &str = "fly-io";

pub struct FlyDriver {
    client: HttpClient,
    credentials: Credentials,
}

impl FlyDriver {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            client: HttpClient::new("Fly.io", base_url, timeout)?,
            credentials,
        })
    }

    fn deploy_payload(request: &DeploymentRequest<'_>, app_name: &str) -> Value {
        let config = request.config;

        let mut machine = json!({
            "env": config.environment_variables,
            "services": [{
                "internal_port": request.fragment.template.internal_port(),
                "protocol": "tcp",
                "http_checks": [{
                    "interval": "10s",
                    "timeout": "2s",
                    "grace_period": "5s",
                    "method": "GET",
                    "path": config.health_check_path.as_deref().unwrap_or("/"),
                }],
            }],
        });
        if let Some(memory) = &config.resources.memory_limit {
            machine["vm"] = json!({ "memory": memory });
        }
        if !config.regions.is_empty() {
            machine["regions"] = json!(config.regions);
        }

        json!({
            "image": format!("registry.fly.io/{}:latest", app_name),
            "config": machine,
        })
    }
}

#[async_trait]
impl ProviderDriver for FlyDriver {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn submit(&self, request: &DeploymentRequest<'_>) -> Result<Submission, EngineError> {
        let token = require(&self.credentials.fly_token, "FLY_TOKEN")?;

        let app: Value = self
            .client
            .post(
                "/v1/apps",
                token,
                &json!({
                    "app_name": request.app_name(),
                    "org_slug": self.credentials.fly_org_slug,
                }),
            )
            .await?;
        let app_name = str_field(&app, "/name").unwrap_or_else(|| request.app_name());

        let deploy: Value = self
            .client
            .post(
                &format!("/v1/apps/{}/deploy", app_name),
                token,
                &Self::deploy_payload(request, &app_name),
            )
            .await?;
        info!("Fly.io app {} deployed for {}", app_name, request.deployment_id);

        let mut metadata = BTreeMap::new();
        metadata.insert("provider".to_string(), json!("Fly.io"));
        metadata.insert("appName".to_string(), json!(app_name));
        metadata.insert(
            "deployId".to_string(),
            deploy.get("id").cloned().unwrap_or(Value::Null),
        );
        metadata.insert("framework".to_string(), json!(request.fragment.template));

        Ok(Submission::Completed(ProviderOutcome::confirmed(
            format!("https://{}.fly.dev", app_name),
            metadata,
        )))
    }
}
