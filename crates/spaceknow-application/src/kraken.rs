//! Kraken map results and tile download.
//!
//! A resolved Kraken release job returns a map id and the grid tiles that
//! cover the requested extent. Tiles are fetched as raw bytes and written to
//! disk unchanged.

use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spaceknow_core::{Result, SpaceKnowError, Transport};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Kraken analysis flavours requested per scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    Imagery,
    Cars,
}

impl MapType {
    pub const ALL: [MapType; 2] = [MapType::Imagery, MapType::Cars];

    pub fn as_str(&self) -> &'static str {
        match self {
            MapType::Imagery => "imagery",
            MapType::Cars => "cars",
        }
    }

    /// Endpoint family for the release job, e.g. `/kraken/release/cars/geojson`.
    pub fn endpoint(&self) -> String {
        format!("/kraken/release/{}/geojson", self.as_str())
    }

    /// Grid file served for each tile of this map type.
    pub fn tile_file(&self) -> &'static str {
        match self {
            MapType::Imagery => "truecolor.png",
            MapType::Cars => "detections.geojson",
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grid tile coordinate, serialized by the service as `[zoom, x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 3]", into = "[u32; 3]")]
pub struct TileCoord {
    pub zoom: u32,
    pub x: u32,
    pub y: u32,
}

impl From<[u32; 3]> for TileCoord {
    fn from([zoom, x, y]: [u32; 3]) -> Self {
        Self { zoom, x, y }
    }
}

impl From<TileCoord> for [u32; 3] {
    fn from(tile: TileCoord) -> Self {
        [tile.zoom, tile.x, tile.y]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KrakenMap {
    pub map_id: String,
    #[serde(default)]
    pub max_zoom: Option<u32>,
    #[serde(default)]
    pub tiles: Vec<TileCoord>,
}

impl KrakenMap {
    /// Decodes a Kraken retrieve payload. `mapId` is required.
    pub fn parse(context: &str, payload: &Value) -> Result<Self> {
        match payload.get("mapId") {
            Some(Value::String(id)) if !id.is_empty() => {}
            _ => return Err(SpaceKnowError::malformed(context, "mapId")),
        }
        serde_json::from_value(payload.clone())
            .map_err(|_| SpaceKnowError::malformed(context, "tiles"))
    }
}

/// Downloads Kraken grid tiles through the [`Transport`].
#[derive(Clone)]
pub struct TileFetcher {
    transport: Arc<dyn Transport>,
    base_url: String,
    concurrency: usize,
}

impl TileFetcher {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            concurrency: 4,
        }
    }

    /// Maximum number of tiles fetched at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// `{base}/kraken/grid/{mapId}/-/{z}/{x}/{y}/{file}`
    pub fn tile_url(&self, map_id: &str, tile: TileCoord, file: &str) -> String {
        format!(
            "{}/kraken/grid/{}/-/{}/{}/{}/{}",
            self.base_url, map_id, tile.zoom, tile.x, tile.y, file
        )
    }

    /// Writes every tile of `map` under `{out_dir}/{mapId}/` and returns the
    /// written paths in tile order.
    pub async fn download(
        &self,
        map: &KrakenMap,
        map_type: MapType,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let dir = out_dir.join(&map.map_id);
        tokio::fs::create_dir_all(&dir).await?;

        let file = map_type.tile_file();
        let paths: Vec<PathBuf> = futures::stream::iter(map.tiles.iter().copied())
            .map(|tile| {
                let url = self.tile_url(&map.map_id, tile, file);
                let path = dir.join(format!("{}_{}_{}_{}", tile.zoom, tile.x, tile.y, file));
                async move {
                    let bytes = self.transport.get_bytes(&url).await?;
                    tokio::fs::write(&path, &bytes).await?;
                    Ok::<_, SpaceKnowError>(path)
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        tracing::info!(
            map_id = %map.map_id,
            %map_type,
            tiles = paths.len(),
            dir = %dir.display(),
            "Downloaded tiles"
        );
        Ok(paths)
    }
}
