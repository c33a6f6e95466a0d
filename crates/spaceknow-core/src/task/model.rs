//! Task domain model.
//!
//! Value objects describing a long-running remote job: the server-issued
//! handle, the bookkeeping record kept while the job is pending, and the
//! status derived from each poll response.

use crate::error::{Result, SpaceKnowError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Opaque identifier issued by the service for a submitted job (`pipelineId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobHandle {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Polling metadata kept for a job between `initiate` and a terminal `retrieve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Resource path family used for `/initiate` and `/retrieve`, e.g. `/imagery/search`.
    pub endpoint: String,
    /// Earliest instant at which the next status check is permitted.
    pub next_poll_time: Instant,
}

impl TaskRecord {
    pub fn new(endpoint: impl Into<String>, next_poll_time: Instant) -> Self {
        Self {
            endpoint: endpoint.into(),
            next_poll_time,
        }
    }

    /// Time left until the next poll is allowed; zero when already due.
    pub fn wait_from(&self, now: Instant) -> Duration {
        self.next_poll_time.saturating_duration_since(now)
    }
}

/// Remote job status as reported by `/tasking/get-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Anything that is not terminal (`NEW`, `PROCESSING`, empty, unknown).
    Pending,
    Resolved,
    Failed,
}

impl JobStatus {
    /// Maps the wire value onto the three-state model.
    pub fn from_wire(status: &str) -> Self {
        match status {
            "RESOLVED" => Self::Resolved,
            "FAILED" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Resolved => "RESOLVED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Parsed body of a successful `{endpoint}/initiate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct InitiateResponse {
    pub handle: JobHandle,
    pub retry_after: Duration,
}

impl InitiateResponse {
    /// Extracts `pipelineId` and `nextTry`; either missing is a malformed response.
    pub fn parse(context: &str, body: &Value) -> Result<Self> {
        let retry_after = body
            .get("nextTry")
            .and_then(parse_retry_hint)
            .ok_or_else(|| SpaceKnowError::malformed(context, "nextTry"))?;
        let handle = body
            .get("pipelineId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(JobHandle::from)
            .ok_or_else(|| SpaceKnowError::malformed(context, "pipelineId"))?;

        Ok(Self {
            handle,
            retry_after,
        })
    }
}

/// Parsed body of a `/tasking/get-status` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub status: JobStatus,
    /// Fresh retry hint; only meaningful (and required) while pending.
    pub retry_after: Option<Duration>,
    /// Server-provided failure code, passed through on `FAILED`.
    pub error: Option<String>,
    /// Server-provided failure explanation, passed through on `FAILED`.
    pub message: Option<String>,
}

impl StatusReport {
    /// A missing `status` field is malformed; an empty or unknown one is pending.
    pub fn parse(context: &str, body: &Value) -> Result<Self> {
        let raw = body
            .get("status")
            .ok_or_else(|| SpaceKnowError::malformed(context, "status"))?;
        let status = match raw {
            Value::String(s) => JobStatus::from_wire(s),
            Value::Null => JobStatus::Pending,
            _ => return Err(SpaceKnowError::malformed(context, "status")),
        };

        Ok(Self {
            status,
            retry_after: body.get("nextTry").and_then(parse_retry_hint),
            error: string_field(body, "error"),
            message: string_field(body, "errorMessage"),
        })
    }
}

/// Interprets a `nextTry` value as whole seconds.
///
/// Integers and numeric strings are accepted; negative hints collapse to zero.
pub fn parse_retry_hint(value: &Value) -> Option<Duration> {
    let secs = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    Some(Duration::from_secs(secs.max(0) as u64))
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}
