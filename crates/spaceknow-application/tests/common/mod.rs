#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use spaceknow_core::task::TaskRegistry;
use spaceknow_core::{Result, SpaceKnowError, Transport};
use spaceknow_infrastructure::InMemoryTaskRegistry;
use spaceknow_application::TaskOrchestrator;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Call {
    pub path: String,
    pub body: Value,
    pub at: Instant,
}

/// Transport that replays canned responses and records every request.
///
/// Responses are queued per path, or per `path` + `pipelineId` when several
/// jobs share the status endpoint.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Value>>>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, path: &str, response: Value) {
        self.enqueue(path.to_string(), Ok(response));
    }

    pub fn push_for(&self, path: &str, pipeline_id: &str, response: Value) {
        self.enqueue(format!("{path}#{pipeline_id}"), Ok(response));
    }

    pub fn push_err(&self, path: &str, err: SpaceKnowError) {
        self.enqueue(path.to_string(), Err(err));
    }

    pub fn put_blob(&self, url: &str, bytes: &[u8]) {
        self.blobs
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }

    fn enqueue(&self, key: String, response: Result<Value>) {
        self.responses
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(response);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.calls.lock().unwrap().push(Call {
            path: path.to_string(),
            body: body.clone(),
            at: Instant::now(),
        });

        let mut responses = self.responses.lock().unwrap();
        if let Some(id) = body.get("pipelineId").and_then(Value::as_str) {
            let key = format!("{path}#{id}");
            if let Some(response) = responses.get_mut(&key).and_then(VecDeque::pop_front) {
                return response;
            }
        }
        responses
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(SpaceKnowError::transport(format!(
                    "no scripted response for {path}"
                )))
            })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(Call {
            path: url.to_string(),
            body: Value::Null,
            at: Instant::now(),
        });
        self.blobs
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| SpaceKnowError::Request {
                status: 404,
                error: None,
                message: Some(format!("no blob for {url}")),
            })
    }
}

pub fn orchestrator(transport: &Arc<ScriptedTransport>) -> (TaskOrchestrator, Arc<InMemoryTaskRegistry>) {
    let registry = Arc::new(InMemoryTaskRegistry::new());
    let orchestrator = TaskOrchestrator::new(
        transport.clone() as Arc<dyn Transport>,
        registry.clone() as Arc<dyn TaskRegistry>,
    );
    (orchestrator, registry)
}
