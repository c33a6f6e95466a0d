//! Transport and credential collaborator traits.
//!
//! The orchestrator depends only on these seams; the reqwest-backed
//! implementations live in `spaceknow-infrastructure`.

use crate::config::Credentials;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Authenticated access to the remote API.
///
/// Non-2xx responses must be reported as `SpaceKnowError::Request`, carrying
/// the server's `error` / `errorMessage` fields when the body provides them.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs `body` as JSON to `path` (relative to the API root) and decodes
    /// the JSON response.
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value>;

    /// GETs an absolute URL and returns the raw response body.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Exchanges account credentials for a bearer token.
///
/// Failures are reported as `SpaceKnowError::Authentication` and are never
/// retried.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn acquire_token(&self, credentials: &Credentials) -> Result<String>;
}
