//! reqwest-backed [`Transport`] for the SpaceKnow REST API.

use crate::auth::{SessionToken, build_client};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use spaceknow_core::config::ApiConfig;
use spaceknow_core::{Result, SpaceKnowError, Transport};
use std::sync::Arc;

/// Sends authenticated JSON requests relative to the API root.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: Arc<SessionToken>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, token: Arc<SessionToken>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_config(config: &ApiConfig, token: Arc<SessionToken>) -> Self {
        Self::new(&config.base_url, token).with_client(build_client(config))
    }

    /// Replaces the HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let token = self.token.bearer().await?;
        let url = self.url_for(path);
        tracing::debug!(%path, "POST");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| SpaceKnowError::transport(format!("POST {path} failed: {e}")))?;

        let response = check_status(response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| SpaceKnowError::transport(format!("Failed to decode {path} response: {e}")))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(%url, "GET");
        let mut request = self.client.get(url);
        // Credentials only go to the API host.
        if url.starts_with(&self.base_url) {
            request = request.bearer_auth(self.token.bearer().await?);
        }
        let response = request
            .send()
            .await
            .map_err(|e| SpaceKnowError::transport(format!("GET {url} failed: {e}")))?;

        let response = check_status(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpaceKnowError::transport(format!("Failed to read {url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(request_error(status, &body))
}

/// Builds a `Request` error from a non-2xx response body.
///
/// SpaceKnow error bodies look like `{"error": "CODE", "errorMessage": "..."}`;
/// anything else is kept verbatim as the message.
fn request_error(status: StatusCode, body: &str) -> SpaceKnowError {
    let (error, message) = match serde_json::from_str::<Value>(body) {
        Ok(json) => (
            json.get("error").and_then(Value::as_str).map(str::to_string),
            json.get("errorMessage")
                .and_then(Value::as_str)
                .map(str::to_string),
        ),
        Err(_) => {
            let trimmed = body.trim();
            (None, (!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
    };

    tracing::warn!(status = status.as_u16(), ?error, "Request rejected");

    SpaceKnowError::Request {
        status: status.as_u16(),
        error,
        message,
    }
}
