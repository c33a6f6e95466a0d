use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod analyze;

#[derive(Parser, Debug)]
#[command(name = "spaceknow")]
#[command(about = "Search imagery over a geometry and run Kraken analyses on the SpaceKnow API", long_about = None)]
pub struct Cli {
    /// SpaceKnow account name
    #[arg(short, long, env = "SPACEKNOW_USERNAME")]
    pub username: String,

    /// SpaceKnow account password
    #[arg(short, long, env = "SPACEKNOW_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// GeoJSON file with the area of interest (geometry or Feature)
    #[arg(short, long)]
    pub geometry: PathBuf,

    /// Directory that receives downloaded tiles
    #[arg(short, long, default_value = "spaceknow-output")]
    pub output: PathBuf,

    /// Number of scenes per dataset that get Kraken analyses
    #[arg(long, default_value_t = 1)]
    pub max_scenes: usize,

    /// Start of the search window, "YYYY-MM-DD HH:MM:SS"
    #[arg(long)]
    pub start: Option<String>,

    /// End of the search window, "YYYY-MM-DD HH:MM:SS"
    #[arg(long)]
    pub end: Option<String>,

    /// Give up on a job after this many status checks
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Give up on a job after this many seconds of polling
    #[arg(long)]
    pub poll_deadline: Option<u64>,

    /// Config file (defaults to ~/.config/spaceknow/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Skip downloading Kraken tiles
    #[arg(long)]
    pub no_tiles: bool,
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let summary = analyze::run(&cli).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_short_flags() {
        let cli = Cli::try_parse_from([
            "spaceknow", "-u", "alice", "-p", "secret", "-g", "area.geojson",
        ])
        .unwrap();
        assert_eq!(cli.username, "alice");
        assert_eq!(cli.geometry, PathBuf::from("area.geojson"));
        assert_eq!(cli.max_scenes, 1);
        assert!(cli.max_polls.is_none());
        assert!(!cli.no_tiles);
    }

    #[test]
    fn test_cli_polling_bounds() {
        let cli = Cli::try_parse_from([
            "spaceknow",
            "-u",
            "alice",
            "-p",
            "secret",
            "-g",
            "area.geojson",
            "--max-polls",
            "20",
            "--poll-deadline",
            "900",
        ])
        .unwrap();
        assert_eq!(cli.max_polls, Some(20));
        assert_eq!(cli.poll_deadline, Some(900));
    }
}
