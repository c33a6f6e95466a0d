//! Task registry trait.
//!
//! Defines the bookkeeping interface for jobs that have been initiated but
//! not yet retrieved.

use super::model::{JobHandle, TaskRecord};
use crate::error::Result;
use async_trait::async_trait;
use tokio::time::Instant;

/// Exclusive owner of every [`TaskRecord`].
///
/// The registry performs no network I/O. Implementations must make each
/// operation atomic with respect to the others so that concurrent flows
/// polling different handles never lose a `next_poll_time` update.
///
/// # Errors
///
/// - `put` fails with `DuplicateHandle` if the handle is already tracked.
/// - `get` and `update_next_poll_time` fail with `UnknownHandle` for handles
///   that were never registered or have already been removed.
#[async_trait]
pub trait TaskRegistry: Send + Sync {
    /// Registers a freshly initiated job.
    async fn put(&self, handle: JobHandle, endpoint: String, next_poll_time: Instant)
    -> Result<()>;

    /// Returns a snapshot of the record for `handle`.
    async fn get(&self, handle: &JobHandle) -> Result<TaskRecord>;

    /// Moves the next permitted poll instant. Only `next_poll_time` changes.
    async fn update_next_poll_time(&self, handle: &JobHandle, time: Instant) -> Result<()>;

    /// Drops the record. Removing an absent handle is a no-op.
    async fn remove(&self, handle: &JobHandle);

    /// Whether `handle` is currently tracked.
    async fn contains(&self, handle: &JobHandle) -> bool;

    /// Number of tracked jobs.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
