//! Render driver: REST service creation followed by a deploy trigger.
//!
//! Render deployments are not polled: a 2xx answer to the deploy trigger is
//! the confirmation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::EngineError;
use crate::http::client::HttpClient;
use crate::providers::credentials::{require, Credentials};
use crate::providers::{str_field, DeploymentRequest, ProviderDriver, ProviderOutcome, Submission};

pub const PROVIDER_ID: &str = "render";
const DEFAULT_REGION: &str = "oregon";

pub struct RenderDriver {
    client: HttpClient,
    credentials: Credentials,
}

impl RenderDriver {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            client: HttpClient::new("Render", base_url, timeout)?,
            credentials,
        })
    }

    fn service_payload(request: &DeploymentRequest<'_>) -> Value {
        let config = request.config;
        let env_vars: Vec<Value> = config
            .environment_variables
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();

        json!({
            "type": "web_service",
            "name": request.app_name(),
            "plan": "free",
            "env": "docker",
            "buildCommand": config.build_command,
            "startCommand": request.fragment.template.start_command(),
            "healthCheckPath": config.health_check_path,
            "envVars": env_vars,
            "region": config.regions.first().map(String::as_str).unwrap_or(DEFAULT_REGION),
        })
    }
}

#[async_trait]
impl ProviderDriver for RenderDriver {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn submit(&self, request: &DeploymentRequest<'_>) -> Result<Submission, EngineError> {
        let token = require(&self.credentials.render_token, "RENDER_TOKEN")?;

        let service: Value = self
            .client
            .post("/v1/services", token, &Self::service_payload(request))
            .await?;
        // Newer API versions wrap the service object
        let service = service.get("service").cloned().unwrap_or(service);

        let service_id = str_field(&service, "/id").ok_or_else(|| EngineError::ProviderApi {
            provider: "Render".to_string(),
            status: 200,
            message: "service response has no id".to_string(),
        })?;
        let service_name = str_field(&service, "/name").unwrap_or_else(|| request.app_name());

        let deploy: Value = self
            .client
            .post(
                &format!("/v1/services/{}/deploys", service_id),
                token,
                &json!({ "clearCache": "do_not_clear" }),
            )
            .await?;
        info!(
            "Render service {} deploy triggered for {}",
            service_id, request.deployment_id
        );

        let mut metadata = BTreeMap::new();
        metadata.insert("provider".to_string(), json!("Render"));
        metadata.insert("serviceId".to_string(), json!(service_id));
        metadata.insert(
            "deployId".to_string(),
            deploy.get("id").cloned().unwrap_or(Value::Null),
        );
        metadata.insert("framework".to_string(), json!(request.fragment.template));

        Ok(Submission::Completed(ProviderOutcome::confirmed(
            format!("https://{}.onrender.com", service_name),
            metadata,
        )))
    }
}
