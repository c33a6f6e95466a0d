//! Error types for the SpaceKnow client.

use crate::task::JobHandle;
use std::time::Duration;
use thiserror::Error;

/// A shared error type for the entire client.
///
/// Every layer (registry, transport, orchestrator, workflows) reports failures
/// through this enum so callers can match on the condition instead of parsing
/// messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpaceKnowError {
    /// Credential exchange failed (bad username/password or auth service down)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The remote service answered with a non-2xx status
    #[error("Request failed with HTTP {status}: {}", describe(.error, .message))]
    Request {
        status: u16,
        /// Server-provided error code (`error` field), if any
        error: Option<String>,
        /// Server-provided explanation (`errorMessage` field), if any
        message: Option<String>,
    },

    /// Network-level failure (connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A success response did not carry a required field
    #[error("Malformed response from {context}: missing or invalid '{field}'")]
    MalformedResponse {
        context: String,
        field: &'static str,
    },

    /// Registry lookup for a handle that was never initiated or already removed
    #[error("Unknown job handle '{0}'")]
    UnknownHandle(JobHandle),

    /// Registry insert for a handle that is already tracked
    #[error("Job handle '{0}' is already registered")]
    DuplicateHandle(JobHandle),

    /// The remote job itself reported failure
    #[error("Task '{handle}' failed: {}", describe(.error, .message))]
    FailedTask {
        handle: JobHandle,
        error: Option<String>,
        message: Option<String>,
    },

    /// Polling stopped because the configured deadline elapsed
    #[error("Task '{handle}' did not resolve within {waited:?}")]
    DeadlineExceeded { handle: JobHandle, waited: Duration },

    /// Polling stopped because the configured attempt cap was reached
    #[error("Task '{handle}' did not resolve after {attempts} status checks")]
    PollAttemptsExhausted { handle: JobHandle, attempts: u32 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// The remote service returned something this client cannot handle yet
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

fn describe(error: &Option<String>, message: &Option<String>) -> String {
    match (error, message) {
        (Some(code), Some(msg)) => format!("{code} ({msg})"),
        (Some(code), None) => code.clone(),
        (None, Some(msg)) => msg.clone(),
        (None, None) => "no details provided".to_string(),
    }
}

impl SpaceKnowError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a MalformedResponse error
    pub fn malformed(context: impl Into<String>, field: &'static str) -> Self {
        Self::MalformedResponse {
            context: context.into(),
            field,
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is an UnknownHandle error
    pub fn is_unknown_handle(&self) -> bool {
        matches!(self, Self::UnknownHandle(_))
    }

    /// Check if this is a FailedTask error
    pub fn is_failed_task(&self) -> bool {
        matches!(self, Self::FailedTask { .. })
    }

    /// Check if this is a MalformedResponse error
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }

    /// Returns the HTTP status for `Request` errors.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether polling stopped on a caller-configured bound rather than on the
    /// remote job. The task record stays registered in that case.
    pub fn is_poll_limit(&self) -> bool {
        matches!(
            self,
            Self::DeadlineExceeded { .. } | Self::PollAttemptsExhausted { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for SpaceKnowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for SpaceKnowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SpaceKnowError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, SpaceKnowError>`.
pub type Result<T> = std::result::Result<T, SpaceKnowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display_includes_server_detail() {
        let err = SpaceKnowError::Request {
            status: 403,
            error: Some("NOT-AUTHORIZED".to_string()),
            message: Some("Token expired".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Request failed with HTTP 403: NOT-AUTHORIZED (Token expired)"
        );
        assert_eq!(err.http_status(), Some(403));
    }

    #[test]
    fn test_failed_task_without_detail() {
        let err = SpaceKnowError::FailedTask {
            handle: JobHandle::from("p1"),
            error: None,
            message: None,
        };
        assert!(err.is_failed_task());
        assert_eq!(err.to_string(), "Task 'p1' failed: no details provided");
    }

    #[test]
    fn test_poll_limit_classification() {
        let deadline = SpaceKnowError::DeadlineExceeded {
            handle: JobHandle::from("p1"),
            waited: Duration::from_secs(5),
        };
        let attempts = SpaceKnowError::PollAttemptsExhausted {
            handle: JobHandle::from("p1"),
            attempts: 3,
        };
        assert!(deadline.is_poll_limit());
        assert!(attempts.is_poll_limit());
        assert!(!SpaceKnowError::UnknownHandle(JobHandle::from("p1")).is_poll_limit());
    }

    #[test]
    fn test_from_serde_json_error() {
        let err: SpaceKnowError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, SpaceKnowError::Serialization { ref format, .. } if format == "JSON"));
    }
}
