pub mod auth;
pub mod config_service;
pub mod http_transport;
pub mod paths;
pub mod task_registry;

pub use crate::auth::{Auth0CredentialProvider, SessionToken};
pub use crate::config_service::ConfigService;
pub use crate::http_transport::HttpTransport;
pub use crate::task_registry::InMemoryTaskRegistry;
