use async_trait::async_trait;
use spaceknow_core::task::{JobHandle, TaskRecord, TaskRegistry};
use spaceknow_core::{Result, SpaceKnowError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// In-memory registry of pending jobs.
///
/// Records live only for the lifetime of the process. A single lock guards
/// the map and every operation completes its read-modify-write under it, so
/// flows polling different handles may share one registry.
#[derive(Clone, Default)]
pub struct InMemoryTaskRegistry {
    records: Arc<RwLock<HashMap<JobHandle, TaskRecord>>>,
}

impl InMemoryTaskRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles currently being tracked, in no particular order.
    pub async fn handles(&self) -> Vec<JobHandle> {
        let records = self.records.read().await;
        records.keys().cloned().collect()
    }
}

#[async_trait]
impl TaskRegistry for InMemoryTaskRegistry {
    async fn put(
        &self,
        handle: JobHandle,
        endpoint: String,
        next_poll_time: Instant,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&handle) {
            return Err(SpaceKnowError::DuplicateHandle(handle));
        }
        records.insert(handle, TaskRecord::new(endpoint, next_poll_time));
        Ok(())
    }

    async fn get(&self, handle: &JobHandle) -> Result<TaskRecord> {
        let records = self.records.read().await;
        records
            .get(handle)
            .cloned()
            .ok_or_else(|| SpaceKnowError::UnknownHandle(handle.clone()))
    }

    async fn update_next_poll_time(&self, handle: &JobHandle, time: Instant) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(handle)
            .ok_or_else(|| SpaceKnowError::UnknownHandle(handle.clone()))?;
        record.next_poll_time = time;
        Ok(())
    }

    async fn remove(&self, handle: &JobHandle) {
        let mut records = self.records.write().await;
        records.remove(handle);
    }

    async fn contains(&self, handle: &JobHandle) -> bool {
        let records = self.records.read().await;
        records.contains_key(handle)
    }

    async fn len(&self) -> usize {
        let records = self.records.read().await;
        records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_put_and_get() {
        let registry = InMemoryTaskRegistry::new();
        let now = Instant::now();

        registry
            .put(JobHandle::from("p1"), "/imagery/search".to_string(), now)
            .await
            .unwrap();

        let record = registry.get(&JobHandle::from("p1")).await.unwrap();
        assert_eq!(record.endpoint, "/imagery/search");
        assert_eq!(record.next_poll_time, now);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_put_is_rejected() {
        let registry = InMemoryTaskRegistry::new();
        let now = Instant::now();
        registry
            .put(JobHandle::from("p1"), "/a".to_string(), now)
            .await
            .unwrap();

        let err = registry
            .put(JobHandle::from("p1"), "/b".to_string(), now)
            .await
            .unwrap_err();
        assert_eq!(err, SpaceKnowError::DuplicateHandle(JobHandle::from("p1")));
        // The original record is untouched
        assert_eq!(registry.get(&JobHandle::from("p1")).await.unwrap().endpoint, "/a");
    }

    #[tokio::test]
    async fn test_unknown_handle() {
        let registry = InMemoryTaskRegistry::new();
        let handle = JobHandle::from("missing");

        assert!(registry.get(&handle).await.unwrap_err().is_unknown_handle());
        assert!(
            registry
                .update_next_poll_time(&handle, Instant::now())
                .await
                .unwrap_err()
                .is_unknown_handle()
        );
    }

    #[tokio::test]
    async fn test_update_only_moves_poll_time() {
        let registry = InMemoryTaskRegistry::new();
        let handle = JobHandle::from("p1");
        let now = Instant::now();
        registry
            .put(handle.clone(), "/kraken/release/cars/geojson".to_string(), now)
            .await
            .unwrap();

        let later = now + Duration::from_secs(30);
        registry.update_next_poll_time(&handle, later).await.unwrap();

        let record = registry.get(&handle).await.unwrap();
        assert_eq!(record.next_poll_time, later);
        assert_eq!(record.endpoint, "/kraken/release/cars/geojson");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = InMemoryTaskRegistry::new();
        let handle = JobHandle::from("p1");
        registry
            .put(handle.clone(), "/a".to_string(), Instant::now())
            .await
            .unwrap();

        registry.remove(&handle).await;
        registry.remove(&handle).await;

        assert!(!registry.contains(&handle).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_on_distinct_handles() {
        let registry = InMemoryTaskRegistry::new();
        let base = Instant::now();

        for i in 0..16 {
            registry
                .put(JobHandle::new(format!("p{i}")), "/a".to_string(), base)
                .await
                .unwrap();
        }

        let mut joins = Vec::new();
        for i in 0..16u64 {
            let registry = registry.clone();
            joins.push(tokio::spawn(async move {
                let handle = JobHandle::new(format!("p{i}"));
                registry
                    .update_next_poll_time(&handle, base + Duration::from_secs(i))
                    .await
            }));
        }
        for join in joins {
            join.await.unwrap().unwrap();
        }

        for i in 0..16u64 {
            let record = registry.get(&JobHandle::new(format!("p{i}"))).await.unwrap();
            assert_eq!(record.next_poll_time, base + Duration::from_secs(i));
        }
        assert_eq!(registry.handles().await.len(), 16);
    }
}
