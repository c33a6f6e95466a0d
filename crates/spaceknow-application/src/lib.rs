pub mod imagery;
pub mod kraken;
pub mod orchestrator;

pub use imagery::{DatasetQuery, DatasetReport, ImageryWorkflow, SceneAnalysis};
pub use kraken::{KrakenMap, MapType, TileCoord, TileFetcher};
pub use orchestrator::{STATUS_PATH, TaskOrchestrator};
