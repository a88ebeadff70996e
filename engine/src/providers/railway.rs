//! Railway driver: GraphQL service creation followed by a deployment trigger.
//!
//! Railway deployments are not polled: a successful `deploymentCreate` is the
//! confirmation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::EngineError;
use crate::http::client::HttpClient;
use crate::providers::credentials::{require, Credentials};
use crate::providers::{
    https_url, str_field, DeploymentRequest, ProviderDriver, ProviderOutcome, Submission,
};

pub const PROVIDER_ID: &str = "railway";
const GRAPHQL_PATH: &str = "/graphql/v2";

const SERVICE_CREATE: &str = "mutation ServiceCreate($input: ServiceCreateInput!) {
  serviceCreate(input: $input) { id name }
}";

const DEPLOYMENT_CREATE: &str = "mutation DeploymentCreate($input: DeploymentCreateInput!) {
  deploymentCreate(input: $input) { id status url }
}";

pub struct RailwayDriver {
    client: HttpClient,
    credentials: Credentials,
}

impl RailwayDriver {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            client: HttpClient::new("Railway", base_url, timeout)?,
            credentials,
        })
    }

    /// Run one GraphQL operation and return its `data`
    async fn graphql(
        &self,
        token: &SecretString,
        query: &str,
        input: Value,
    ) -> Result<Value, EngineError> {
        let response: Value = self
            .client
            .post(
                GRAPHQL_PATH,
                token,
                &json!({ "query": query, "variables": { "input": input } }),
            )
            .await?;

        if let Some(errors) = response.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let message = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(EngineError::ProviderApi {
                    provider: "Railway".to_string(),
                    status: 200,
                    message,
                });
            }
        }

        Ok(response.get("data").cloned().unwrap_or(Value::Null))
    }
}

fn missing(field: &str) -> EngineError {
    EngineError::ProviderApi {
        provider: "Railway".to_string(),
        status: 200,
        message: format!("response has no {}", field),
    }
}

#[async_trait]
impl ProviderDriver for RailwayDriver {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn submit(&self, request: &DeploymentRequest<'_>) -> Result<Submission, EngineError> {
        let token = require(&self.credentials.railway_token, "RAILWAY_TOKEN")?;
        let project_id = require(&self.credentials.railway_project_id, "RAILWAY_PROJECT_ID")?;
        let config = request.config;

        let service = self
            .graphql(
                token,
                SERVICE_CREATE,
                json!({ "name": request.app_name(), "projectId": project_id }),
            )
            .await?;
        let service_id =
            str_field(&service, "/serviceCreate/id").ok_or_else(|| missing("serviceCreate.id"))?;
        let service_name =
            str_field(&service, "/serviceCreate/name").unwrap_or_else(|| request.app_name());

        let deployment = self
            .graphql(
                token,
                DEPLOYMENT_CREATE,
                json!({
                    "serviceId": service_id,
                    "environmentId": self.credentials.railway_environment_id,
                    "meta": {
                        "source": "api",
                        "config": {
                            "buildCommand": config.build_command,
                            "startCommand": request.fragment.template.start_command(),
                            "environmentVariables": config.environment_variables,
                        },
                    },
                }),
            )
            .await?;
        let railway_deployment_id = str_field(&deployment, "/deploymentCreate/id")
            .ok_or_else(|| missing("deploymentCreate.id"))?;
        info!(
            "Railway deployment {} of service {} created for {}",
            railway_deployment_id, service_id, request.deployment_id
        );

        let url = str_field(&deployment, "/deploymentCreate/url")
            .map(|u| https_url(&u))
            .unwrap_or_else(|| format!("https://{}.up.railway.app", service_name));

        let mut metadata = BTreeMap::new();
        metadata.insert("provider".to_string(), json!("Railway"));
        metadata.insert("serviceId".to_string(), json!(service_id));
        metadata.insert("deploymentId".to_string(), json!(railway_deployment_id));
        metadata.insert("framework".to_string(), json!(request.fragment.template));

        let mut outcome = ProviderOutcome::confirmed(url, metadata);
        if let Some(state) = str_field(&deployment, "/deploymentCreate/status") {
            outcome.state = state;
        }
        Ok(Submission::Completed(outcome))
    }
}
