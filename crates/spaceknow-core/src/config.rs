//! Client configuration model.
//!
//! Loaded by `spaceknow_infrastructure::ConfigService` from `config.toml`;
//! every field has a default so an absent file is a valid configuration.

use crate::task::PollPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.spaceknow.com";
pub const DEFAULT_AUTH_URL: &str = "https://spaceknow.auth0.com/oauth/ro";
pub const DEFAULT_CLIENT_ID: &str = "hmWJcfhRouDOaJK2L8asREMlMrv3jFE1";
pub const DEFAULT_AUTH_CONNECTION: &str = "Username-Password-Authentication";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Root of the tasking API, without trailing slash.
    pub base_url: String,
    /// Auth0 resource-owner endpoint.
    pub auth_url: String,
    pub client_id: String,
    pub auth_connection: String,
    /// Per-request timeout applied by the HTTP transport.
    pub request_timeout_secs: u64,
    pub polling: PollingConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            auth_connection: DEFAULT_AUTH_CONNECTION.to_string(),
            request_timeout_secs: 60,
            polling: PollingConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `[polling]` table. Both bounds default to unset (poll until terminal).
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PollingConfig {
    pub max_attempts: Option<u32>,
    pub deadline_secs: Option<u64>,
}

impl PollingConfig {
    pub fn to_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.max_attempts,
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }
}

/// Account used for the token exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keeps passwords out of logs and panic messages.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polling_config_to_policy() {
        let config = PollingConfig {
            max_attempts: Some(10),
            deadline_secs: Some(300),
        };
        let policy = config.to_policy();
        assert_eq!(policy.max_attempts, Some(10));
        assert_eq!(policy.deadline, Some(Duration::from_secs(300)));
        assert!(PollingConfig::default().to_policy().is_unbounded());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("alice", "hunter2");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));
    }
}
