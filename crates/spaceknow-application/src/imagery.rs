//! Imagery search and Kraken analysis for a geometry.
//!
//! For each dataset: search the imagery catalogue over a time window, pick the
//! first scenes, request an imagery map and a car-detection map per scene, and
//! collect the resulting Kraken maps.

use crate::kraken::{KrakenMap, MapType};
use crate::orchestrator::TaskOrchestrator;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Value, json};
use spaceknow_core::task::JobHandle;
use spaceknow_core::{Result, SpaceKnowError};

pub const IMAGERY_SEARCH_ENDPOINT: &str = "/imagery/search";
/// Timestamp layout expected by the imagery search API.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Provider/dataset pairs processed by default.
pub const DEFAULT_DATASETS: &[(&str, &[&str])] = &[("gbdx", &["idaho-pansharpened"])];

/// One imagery search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetQuery {
    pub provider: String,
    pub dataset: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// How many scenes get Kraken analyses.
    pub max_scenes: usize,
}

impl DatasetQuery {
    /// January 2018, one scene.
    pub fn new(provider: impl Into<String>, dataset: impl Into<String>) -> Self {
        let start = NaiveDateTime::parse_from_str("2018-01-01 00:00:00", DATETIME_FORMAT)
            .unwrap_or_default();
        let end = NaiveDateTime::parse_from_str("2018-02-01 00:00:00", DATETIME_FORMAT)
            .unwrap_or_default();
        Self {
            provider: provider.into(),
            dataset: dataset.into(),
            start,
            end,
            max_scenes: 1,
        }
    }

    pub fn with_window(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_max_scenes(mut self, max_scenes: usize) -> Self {
        self.max_scenes = max_scenes;
        self
    }

    fn search_payload(&self, extent: &Value, cursor: Option<&str>) -> Value {
        let mut payload = json!({
            "provider": self.provider,
            "dataset": self.dataset,
            "startDatetime": self.start.format(DATETIME_FORMAT).to_string(),
            "endDatetime": self.end.format(DATETIME_FORMAT).to_string(),
            "extent": extent,
        });
        if let Some(cursor) = cursor {
            payload["cursor"] = json!(cursor);
        }
        payload
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneAnalysis {
    pub scene_id: String,
    pub map_type: MapType,
    pub map: KrakenMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReport {
    pub provider: String,
    pub dataset: String,
    /// Every scene id collected from the search, in result order.
    pub scene_ids: Vec<String>,
    pub analyses: Vec<SceneAnalysis>,
}

/// Drives the search → Kraken pipeline through a [`TaskOrchestrator`].
#[derive(Clone)]
pub struct ImageryWorkflow {
    orchestrator: TaskOrchestrator,
}

impl ImageryWorkflow {
    pub fn new(orchestrator: TaskOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &TaskOrchestrator {
        &self.orchestrator
    }

    /// Wraps a single geometry into the GeometryCollection extent the API expects.
    pub fn extent(geometry: &Value) -> Value {
        json!({
            "type": "GeometryCollection",
            "geometries": [geometry],
        })
    }

    /// Runs imagery searches, following `cursor` pages until enough scenes
    /// are collected or the results run out.
    pub async fn search_scenes(&self, query: &DatasetQuery, extent: &Value) -> Result<Vec<String>> {
        let context = format!("{IMAGERY_SEARCH_ENDPOINT}/retrieve");
        let mut scene_ids = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let payload = query.search_payload(extent, cursor.as_deref());
            let page = self
                .orchestrator
                .run(IMAGERY_SEARCH_ENDPOINT, &payload)
                .await?;

            let results = page
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| SpaceKnowError::malformed(&context, "results"))?;
            for result in results {
                let scene_id = result
                    .get("sceneId")
                    .and_then(Value::as_str)
                    .ok_or_else(|| SpaceKnowError::malformed(&context, "sceneId"))?;
                scene_ids.push(scene_id.to_string());
            }

            cursor = match page.get("cursor") {
                None | Some(Value::Null) => None,
                Some(Value::String(next)) if !next.is_empty() => Some(next.clone()),
                Some(Value::String(_)) => None,
                Some(_) => return Err(SpaceKnowError::malformed(&context, "cursor")),
            };

            tracing::debug!(
                provider = %query.provider,
                dataset = %query.dataset,
                found = scene_ids.len(),
                more = cursor.is_some(),
                "Imagery search page"
            );

            if cursor.is_none() || scene_ids.len() >= query.max_scenes {
                break;
            }
        }

        Ok(scene_ids)
    }

    /// Searches `query` over `geometry` and requests Kraken maps for the
    /// selected scenes.
    ///
    /// All release jobs are initiated before any is polled; the polls then
    /// run concurrently, one flow per handle. On failure every job this call
    /// registered is abandoned.
    pub async fn process_dataset(&self, geometry: &Value, query: &DatasetQuery) -> Result<DatasetReport> {
        let extent = Self::extent(geometry);
        let scene_ids = self.search_scenes(query, &extent).await?;
        let selected: Vec<&String> = scene_ids.iter().take(query.max_scenes).collect();

        tracing::info!(
            provider = %query.provider,
            dataset = %query.dataset,
            scenes = scene_ids.len(),
            selected = selected.len(),
            "Imagery search finished"
        );

        let mut pending: Vec<(String, MapType, JobHandle)> = Vec::new();
        for map_type in MapType::ALL {
            for scene_id in &selected {
                let payload = json!({ "sceneId": scene_id, "extent": extent });
                match self.orchestrator.initiate(&map_type.endpoint(), &payload).await {
                    Ok(handle) => pending.push(((*scene_id).clone(), map_type, handle)),
                    Err(e) => {
                        self.abandon_all(&pending).await;
                        return Err(e);
                    }
                }
            }
        }

        let retrievals = pending.iter().map(|(scene_id, map_type, handle)| async move {
            let payload = self.orchestrator.retrieve(handle).await?;
            let context = format!("{}/retrieve", map_type.endpoint());
            let map = KrakenMap::parse(&context, &payload)?;
            Ok::<_, SpaceKnowError>(SceneAnalysis {
                scene_id: scene_id.clone(),
                map_type: *map_type,
                map,
            })
        });

        let analyses = match futures::future::try_join_all(retrievals).await {
            Ok(analyses) => analyses,
            Err(e) => {
                self.abandon_all(&pending).await;
                return Err(e);
            }
        };

        Ok(DatasetReport {
            provider: query.provider.clone(),
            dataset: query.dataset.clone(),
            scene_ids,
            analyses,
        })
    }

    async fn abandon_all(&self, pending: &[(String, MapType, JobHandle)]) {
        for (_, _, handle) in pending {
            self.orchestrator.abandon(handle).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_window() {
        let query = DatasetQuery::new("gbdx", "idaho-pansharpened");
        let payload = query.search_payload(&json!({}), None);
        assert_eq!(payload["startDatetime"], "2018-01-01 00:00:00");
        assert_eq!(payload["endDatetime"], "2018-02-01 00:00:00");
        assert_eq!(payload["provider"], "gbdx");
        assert!(payload.get("cursor").is_none());
        assert_eq!(query.max_scenes, 1);
    }

    #[test]
    fn test_search_payload_carries_cursor() {
        let query = DatasetQuery::new("gbdx", "idaho-pansharpened");
        let payload = query.search_payload(&json!({}), Some("next-page"));
        assert_eq!(payload["cursor"], "next-page");
    }

    #[test]
    fn test_extent_wraps_geometry() {
        let geometry = json!({"type": "Point", "coordinates": [1.0, 2.0]});
        let extent = ImageryWorkflow::extent(&geometry);
        assert_eq!(extent["type"], "GeometryCollection");
        assert_eq!(extent["geometries"][0], geometry);
    }
}
