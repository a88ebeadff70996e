//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::EngineError;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bearer-authenticated JSON client for one provider API
pub struct HttpClient {
    client: Client,
    base_url: String,
    provider: String,
}

impl HttpClient {
    /// Create a new HTTP client; `provider` names the API in errors
    pub fn new(provider: &str, base_url: &str, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            provider: provider.to_string(),
        })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &SecretString,
    ) -> Result<T, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let request = self.client.get(&url);
        self.send(request, "GET", token).await
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &SecretString,
        body: &B,
    ) -> Result<T, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let request = self.client.post(&url).json(body);
        self.send(request, "POST", token).await
    }

    /// Make a POST request with a raw body
    pub async fn post_bytes<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &SecretString,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<T, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} ({} bytes, {})", url, body.len(), content_type);

        let request = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, content_type)
            .body(body);
        self.send(request, "POST", token).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        token: &SecretString,
    ) -> Result<T, EngineError> {
        let response = request
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            )
            .send()
            .await?;

        let response = self.check(response, method).await?;
        Ok(response.json().await?)
    }

    async fn check(&self, response: Response, method: &str) -> Result<Response, EngineError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("{} HTTP {} failed: {} - {}", self.provider, method, status, body);

        Err(EngineError::ProviderApi {
            provider: self.provider.clone(),
            status: status.as_u16(),
            message: api_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            }),
        })
    }
}

/// Best-effort error message out of a provider error body
fn api_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))?;

    match message {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
