//! Token acquisition against the SpaceKnow Auth0 tenant.
//!
//! [`Auth0CredentialProvider`] performs the resource-owner password exchange;
//! [`SessionToken`] caches the resulting bearer token for the process so the
//! exchange happens at most once.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use spaceknow_core::config::{ApiConfig, Credentials};
use spaceknow_core::{CredentialProvider, Result, SpaceKnowError};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Exchanges username/password for an `id_token` via Auth0's `/oauth/ro`.
#[derive(Clone)]
pub struct Auth0CredentialProvider {
    client: Client,
    auth_url: String,
    client_id: String,
    connection: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Auth0Error {
    error: Option<String>,
    error_description: Option<String>,
}

impl Auth0CredentialProvider {
    pub fn new(
        auth_url: impl Into<String>,
        client_id: impl Into<String>,
        connection: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            auth_url: auth_url.into(),
            client_id: client_id.into(),
            connection: connection.into(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(&config.auth_url, &config.client_id, &config.auth_connection)
            .with_client(build_client(config))
    }

    /// Replaces the HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl CredentialProvider for Auth0CredentialProvider {
    async fn acquire_token(&self, credentials: &Credentials) -> Result<String> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("connection", self.connection.as_str()),
            ("grant_type", "password"),
            ("scope", "openid"),
        ];

        tracing::debug!(username = %credentials.username, "Requesting auth token");

        let response = self
            .client
            .post(&self.auth_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| SpaceKnowError::Authentication(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<Auth0Error>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or(body);
            return Err(SpaceKnowError::Authentication(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            SpaceKnowError::Authentication(format!("failed to parse token response: {e}"))
        })?;

        token
            .id_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SpaceKnowError::Authentication("token response did not contain id_token".into())
            })
    }
}

/// Process-scoped bearer token, acquired lazily on first use.
///
/// Create one per process and hand it to the transport. Concurrent first
/// callers wait on the same exchange; afterwards the token is read-only.
pub struct SessionToken {
    provider: Option<Arc<dyn CredentialProvider>>,
    credentials: Option<Credentials>,
    token: OnceCell<String>,
}

impl SessionToken {
    pub fn new(provider: Arc<dyn CredentialProvider>, credentials: Credentials) -> Self {
        Self {
            provider: Some(provider),
            credentials: Some(credentials),
            token: OnceCell::new(),
        }
    }

    /// Wraps a token that was obtained elsewhere.
    pub fn preset(token: impl Into<String>) -> Self {
        Self {
            provider: None,
            credentials: None,
            token: OnceCell::from(token.into()),
        }
    }

    /// Returns the cached token, performing the exchange on first call.
    ///
    /// A failed exchange leaves the cell empty, so a later call retries it.
    pub async fn bearer(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| async {
                match (&self.provider, &self.credentials) {
                    (Some(provider), Some(credentials)) => {
                        let token = provider.acquire_token(credentials).await?;
                        tracing::info!(username = %credentials.username, "Authenticated");
                        Ok(token)
                    }
                    _ => Err(SpaceKnowError::Authentication(
                        "no credentials configured".into(),
                    )),
                }
            })
            .await?;
        Ok(token.as_str())
    }

    pub fn is_acquired(&self) -> bool {
        self.token.initialized()
    }
}

pub(crate) fn build_client(config: &ApiConfig) -> Client {
    Client::builder()
        .timeout(config.request_timeout())
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            Client::new()
        })
}
