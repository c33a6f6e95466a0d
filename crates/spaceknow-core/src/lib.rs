pub mod config;
pub mod error;
pub mod task;
pub mod transport;

// Re-export common error type
pub use error::{Result, SpaceKnowError};
pub use transport::{CredentialProvider, Transport};
