//! Netlify driver: create a site, upload a zip deploy, poll the deploy

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::deploy::artifacts::ArtifactSet;
use crate::errors::EngineError;
use crate::http::client::HttpClient;
use crate::providers::credentials::{require, Credentials};
use crate::providers::{
    str_field, timestamp, DeploymentRequest, PollOutcome, ProviderDriver, ProviderHandle,
    ProviderOutcome, Submission,
};

pub const PROVIDER_ID: &str = "netlify";

pub struct NetlifyDriver {
    client: HttpClient,
    credentials: Credentials,
}

impl NetlifyDriver {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            client: HttpClient::new("Netlify", base_url, timeout)?,
            credentials,
        })
    }

    fn outcome(status: &Value, handle: &ProviderHandle, success: bool) -> ProviderOutcome {
        let mut metadata = handle.metadata.clone();
        metadata.insert("provider".to_string(), json!("Netlify"));
        metadata.insert("deployId".to_string(), json!(handle.id));

        ProviderOutcome {
            success,
            state: str_field(status, "/state").unwrap_or_default(),
            url: str_field(status, "/ssl_url").or_else(|| str_field(status, "/url")),
            preview_url: str_field(status, "/deploy_ssl_url"),
            deployment_size: status.get("size").and_then(Value::as_u64).unwrap_or(0),
            deployed_at: timestamp(status.get("published_at").or_else(|| status.get("created_at"))),
            metadata,
        }
    }
}

/// Zip every artifact, deflated, in path order
pub fn zip_artifacts(artifacts: &ArtifactSet) -> Result<Vec<u8>, EngineError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, content) in artifacts.iter() {
        writer.start_file(path, options)?;
        writer.write_all(content.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

#[async_trait]
impl ProviderDriver for NetlifyDriver {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn submit(&self, request: &DeploymentRequest<'_>) -> Result<Submission, EngineError> {
        let token = require(&self.credentials.netlify_token, "NETLIFY_TOKEN")?;

        let site: Value = self
            .client
            .post(
                "/api/v1/sites",
                token,
                &json!({
                    "name": request.app_name(),
                    "custom_domain": request.config.custom_domain,
                }),
            )
            .await?;
        let site_id = str_field(&site, "/id").ok_or_else(|| EngineError::ProviderApi {
            provider: "Netlify".to_string(),
            status: 200,
            message: "site response has no id".to_string(),
        })?;

        let archive = zip_artifacts(request.artifacts)?;
        let deploy: Value = self
            .client
            .post_bytes(
                &format!("/api/v1/sites/{}/deploys", site_id),
                token,
                "application/zip",
                archive,
            )
            .await?;
        let deploy_id = str_field(&deploy, "/id").ok_or_else(|| EngineError::ProviderApi {
            provider: "Netlify".to_string(),
            status: 200,
            message: "deploy response has no id".to_string(),
        })?;
        info!(
            "Netlify deploy {} on site {} created for {}",
            deploy_id, site_id, request.deployment_id
        );

        let mut metadata = BTreeMap::new();
        metadata.insert("siteId".to_string(), json!(site_id));
        metadata.insert("framework".to_string(), json!(request.fragment.template));

        Ok(Submission::Pending(ProviderHandle {
            id: deploy_id,
            metadata,
        }))
    }

    async fn poll(&self, handle: &ProviderHandle) -> Result<PollOutcome, EngineError> {
        let token = require(&self.credentials.netlify_token, "NETLIFY_TOKEN")?;
        let status: Value = self
            .client
            .get(&format!("/api/v1/deploys/{}", handle.id), token)
            .await?;

        let state = str_field(&status, "/state").unwrap_or_default();
        Ok(match state.as_str() {
            "ready" => PollOutcome::Terminal(Self::outcome(&status, handle, true)),
            "error" => PollOutcome::Terminal(Self::outcome(&status, handle, false)),
            _ => PollOutcome::InProgress(format!("Netlify deployment status: {}", state)),
        })
    }
}
