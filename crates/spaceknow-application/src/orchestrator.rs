//! Task orchestrator: initiate → poll until terminal → retrieve.
//!
//! The orchestrator owns no state of its own. Everything that must survive
//! between `initiate` and `retrieve` lives in the [`TaskRegistry`], so any
//! flow holding the registry can finish a job another flow started.

use serde_json::{Value, json};
use spaceknow_core::task::{
    InitiateResponse, JobHandle, JobStatus, PollPolicy, StatusReport, TaskRegistry,
};
use spaceknow_core::{Result, SpaceKnowError, Transport};
use std::sync::Arc;
use tokio::time::Instant;

/// Status-check path shared by every endpoint family.
pub const STATUS_PATH: &str = "/tasking/get-status";

#[derive(Clone)]
pub struct TaskOrchestrator {
    transport: Arc<dyn Transport>,
    registry: Arc<dyn TaskRegistry>,
    policy: PollPolicy,
}

impl TaskOrchestrator {
    /// Creates an orchestrator that polls without bounds.
    pub fn new(transport: Arc<dyn Transport>, registry: Arc<dyn TaskRegistry>) -> Self {
        Self {
            transport,
            registry,
            policy: PollPolicy::unbounded(),
        }
    }

    /// Sets the bounds used by [`retrieve`](Self::retrieve).
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &Arc<dyn TaskRegistry> {
        &self.registry
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Submits `payload` to `{endpoint}/initiate` and registers the job.
    ///
    /// The registry is only touched once the response has been validated, so a
    /// malformed response leaves no record behind.
    pub async fn initiate(&self, endpoint: &str, payload: &Value) -> Result<JobHandle> {
        let path = format!("{endpoint}/initiate");
        let body = self.transport.post_json(&path, payload).await?;
        let response = InitiateResponse::parse(&path, &body)?;

        let next_poll_time = Instant::now()
            .checked_add(response.retry_after)
            .ok_or_else(|| SpaceKnowError::malformed(&path, "nextTry"))?;
        self.registry
            .put(response.handle.clone(), endpoint.to_string(), next_poll_time)
            .await?;

        tracing::info!(
            handle = %response.handle,
            %endpoint,
            retry_after_secs = response.retry_after.as_secs(),
            "Task initiated"
        );
        Ok(response.handle)
    }

    /// Waits for the job to resolve and returns its result payload, using the
    /// orchestrator's configured [`PollPolicy`].
    pub async fn retrieve(&self, handle: &JobHandle) -> Result<Value> {
        let policy = self.policy;
        self.retrieve_with(handle, &policy).await
    }

    /// Same as [`retrieve`](Self::retrieve) with explicit polling bounds.
    ///
    /// # Errors
    ///
    /// - `UnknownHandle` if `handle` is not registered (no request is sent).
    /// - `FailedTask` if the service reports `FAILED`; the record is removed.
    /// - `MalformedResponse` if a status response lacks `status`, or lacks
    ///   `nextTry` while still pending, or carries a `nextTry` too large to
    ///   schedule.
    /// - `PollAttemptsExhausted` / `DeadlineExceeded` when `policy` is bounded;
    ///   the record stays registered so the caller may resume or abandon it.
    /// - Transport errors from status checks propagate with the record kept.
    ///   A transport error from the final retrieve propagates as-is, and the
    ///   record is removed regardless.
    pub async fn retrieve_with(&self, handle: &JobHandle, policy: &PollPolicy) -> Result<Value> {
        let started = Instant::now();
        // A deadline too far out to represent is no deadline at all.
        let deadline = policy.deadline.and_then(|limit| started.checked_add(limit));
        let request = json!({ "pipelineId": handle.as_str() });
        let mut attempts: u32 = 0;

        let endpoint = loop {
            let record = self.registry.get(handle).await?;

            if !policy.allows_attempt(attempts) {
                tracing::warn!(%handle, attempts, "Giving up: poll attempt cap reached");
                return Err(SpaceKnowError::PollAttemptsExhausted {
                    handle: handle.clone(),
                    attempts,
                });
            }
            if let Some(deadline) = deadline
                && record.next_poll_time > deadline
            {
                tracing::warn!(%handle, "Giving up: next poll falls past the deadline");
                return Err(SpaceKnowError::DeadlineExceeded {
                    handle: handle.clone(),
                    waited: started.elapsed(),
                });
            }

            let wait = record.wait_from(Instant::now());
            if !wait.is_zero() {
                tracing::debug!(%handle, wait_ms = wait.as_millis() as u64, "Waiting for next poll");
                tokio::time::sleep_until(record.next_poll_time).await;
            }

            attempts += 1;
            let body = self.transport.post_json(STATUS_PATH, &request).await?;
            let report = StatusReport::parse(STATUS_PATH, &body)?;
            tracing::debug!(%handle, status = %report.status, attempt = attempts, "Polled task");

            match report.status {
                JobStatus::Failed => {
                    self.registry.remove(handle).await;
                    tracing::warn!(%handle, error = ?report.error, "Task failed");
                    return Err(SpaceKnowError::FailedTask {
                        handle: handle.clone(),
                        error: report.error,
                        message: report.message,
                    });
                }
                JobStatus::Resolved => break record.endpoint,
                JobStatus::Pending => {
                    let retry_after = report
                        .retry_after
                        .ok_or_else(|| SpaceKnowError::malformed(STATUS_PATH, "nextTry"))?;
                    let next_poll_time = Instant::now()
                        .checked_add(retry_after)
                        .ok_or_else(|| SpaceKnowError::malformed(STATUS_PATH, "nextTry"))?;
                    self.registry
                        .update_next_poll_time(handle, next_poll_time)
                        .await?;
                }
            }
        };

        let path = format!("{endpoint}/retrieve");
        let result = self.transport.post_json(&path, &request).await;
        // The job is terminal server-side whatever happened to this last call.
        self.registry.remove(handle).await;

        match &result {
            Ok(_) => tracing::info!(%handle, %endpoint, attempts, "Task resolved"),
            Err(e) => tracing::warn!(%handle, %endpoint, error = %e, "Retrieve failed"),
        }
        result
    }

    /// Initiates a job and waits for its result.
    pub async fn run(&self, endpoint: &str, payload: &Value) -> Result<Value> {
        let handle = self.initiate(endpoint, payload).await?;
        self.retrieve(&handle).await
    }

    /// Forgets a job the caller no longer intends to retrieve.
    pub async fn abandon(&self, handle: &JobHandle) {
        if self.registry.contains(handle).await {
            tracing::info!(%handle, "Abandoning task");
        }
        self.registry.remove(handle).await;
    }
}
