use crate::Cli;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use spaceknow_application::imagery::{DATETIME_FORMAT, DEFAULT_DATASETS};
use spaceknow_application::{
    DatasetQuery, DatasetReport, ImageryWorkflow, TaskOrchestrator, TileFetcher,
};
use spaceknow_core::config::{ApiConfig, Credentials};
use spaceknow_core::task::{PollPolicy, TaskRegistry};
use spaceknow_core::{CredentialProvider, Transport};
use spaceknow_infrastructure::{
    Auth0CredentialProvider, ConfigService, HttpTransport, InMemoryTaskRegistry, SessionToken,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct Summary {
    pub datasets: Vec<DatasetSummary>,
}

#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    #[serde(flatten)]
    pub report: DatasetReport,
    /// Paths of the tiles written to disk.
    pub tiles: Vec<String>,
}

/// Processes every default dataset over the given geometry and summarizes
/// the scenes, maps and downloaded tiles.
pub async fn run(cli: &Cli) -> Result<Summary> {
    let config_service = match &cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };
    let config = config_service
        .get_config()
        .context("Failed to load configuration")?;
    let policy = poll_policy(&config, cli);

    let geometry = load_geometry(&cli.geometry)?;
    let (start, end) = search_window(cli)?;

    let auth: Arc<dyn CredentialProvider> =
        Arc::new(Auth0CredentialProvider::from_config(&config));
    let token = Arc::new(SessionToken::new(
        auth,
        Credentials::new(&cli.username, &cli.password),
    ));
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config, token));
    let registry: Arc<dyn TaskRegistry> = Arc::new(InMemoryTaskRegistry::new());

    let orchestrator = TaskOrchestrator::new(transport.clone(), registry).with_policy(policy);
    let workflow = ImageryWorkflow::new(orchestrator);
    let fetcher = TileFetcher::new(transport, &config.base_url);

    let mut datasets = Vec::new();
    for (provider, names) in DEFAULT_DATASETS {
        for dataset in names.iter() {
            let mut query = DatasetQuery::new(*provider, *dataset).with_max_scenes(cli.max_scenes);
            if let (Some(start), Some(end)) = (start, end) {
                query = query.with_window(start, end);
            }

            tracing::info!(%provider, %dataset, "Processing dataset");
            let report = workflow
                .process_dataset(&geometry, &query)
                .await
                .with_context(|| format!("Failed to process {provider}/{dataset}"))?;

            let mut tiles = Vec::new();
            if !cli.no_tiles {
                for analysis in &report.analyses {
                    let paths = fetcher
                        .download(&analysis.map, analysis.map_type, &cli.output)
                        .await
                        .with_context(|| {
                            format!("Failed to download tiles for map {}", analysis.map.map_id)
                        })?;
                    tiles.extend(paths.into_iter().map(|p| p.display().to_string()));
                }
            }

            datasets.push(DatasetSummary { report, tiles });
        }
    }

    Ok(Summary { datasets })
}

fn poll_policy(config: &ApiConfig, cli: &Cli) -> PollPolicy {
    let mut policy = config.polling.to_policy();
    if let Some(max) = cli.max_polls {
        policy = policy.with_max_attempts(max);
    }
    if let Some(secs) = cli.poll_deadline {
        policy = policy.with_deadline(Duration::from_secs(secs));
    }
    policy
}

/// Reads a GeoJSON geometry; a Feature contributes its `geometry` member.
fn load_geometry(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} as JSON", path.display()))?;
    geometry_of(value).with_context(|| format!("{} does not contain a geometry", path.display()))
}

fn geometry_of(value: Value) -> Option<Value> {
    match value.get("type").and_then(Value::as_str) {
        Some("Feature") => value.get("geometry").filter(|g| !g.is_null()).cloned(),
        Some(_) => Some(value),
        None => None,
    }
}

fn search_window(cli: &Cli) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
    let parse = |label: &str, raw: &Option<String>| -> Result<Option<NaiveDateTime>> {
        raw.as_deref()
            .map(|s| {
                NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
                    .with_context(|| format!("Invalid --{label} '{s}', expected {DATETIME_FORMAT}"))
            })
            .transpose()
    };
    let start = parse("start", &cli.start)?;
    let end = parse("end", &cli.end)?;

    match (start, end) {
        (Some(s), Some(e)) if s >= e => anyhow::bail!("--start must be before --end"),
        (Some(_), None) | (None, Some(_)) => {
            anyhow::bail!("--start and --end must be given together")
        }
        window => Ok(window),
    }
}
