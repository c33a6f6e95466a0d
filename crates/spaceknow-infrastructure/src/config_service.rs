//! Configuration service implementation.
//!
//! Loads [`ApiConfig`] from `~/.config/spaceknow/config.toml` (or an explicit
//! path) and applies environment overrides.

use crate::paths::SpaceKnowPaths;
use spaceknow_core::config::ApiConfig;
use spaceknow_core::{Result, SpaceKnowError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const ENV_BASE_URL: &str = "SPACEKNOW_BASE_URL";
pub const ENV_AUTH_URL: &str = "SPACEKNOW_AUTH_URL";

/// Configuration service that loads and caches the API configuration.
///
/// A missing file is not an error: defaults apply. A file that exists but
/// does not parse is reported as a serialization error.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<ApiConfig>>>,
}

impl ConfigService {
    /// Uses the default location under the user's config directory.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Uses an explicit config file instead of the default location.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<ApiConfig> {
        if let Some(cached) = self
            .config
            .read()
            .map_err(|e| SpaceKnowError::config(format!("config cache poisoned: {e}")))?
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let mut loaded = match self.resolve_path() {
            Some(path) => Self::load_file(&path)?,
            None => ApiConfig::default(),
        };
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());

        *self
            .config
            .write()
            .map_err(|e| SpaceKnowError::config(format!("config cache poisoned: {e}")))? =
            Some(loaded.clone());

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut guard) = self.config.write() {
            *guard = None;
        }
    }

    fn resolve_path(&self) -> Option<PathBuf> {
        match &self.path {
            Some(path) => Some(path.clone()),
            None => SpaceKnowPaths::config_file().ok(),
        }
    }

    fn load_file(path: &Path) -> Result<ApiConfig> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(ApiConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: ApiConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_env_overrides(config: &mut ApiConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
        config.base_url = url;
    }
    if let Some(url) = lookup(ENV_AUTH_URL).filter(|v| !v.is_empty()) {
        config.auth_url = url;
    }
    config.base_url = config.base_url.trim_end_matches('/').to_string();
}

#[cfg(test)]
mod tests {
    use super::*;
    use spaceknow_core::config::DEFAULT_BASE_URL;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigService::load_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ApiConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "request_timeout_secs = 5\n\n[polling]\nmax_attempts = 12\ndeadline_secs = 600"
        )
        .unwrap();

        let config = ConfigService::load_file(file.path()).unwrap();
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.polling.max_attempts, Some(12));
        assert_eq!(config.polling.deadline_secs, Some(600));
    }

    #[test]
    fn test_invalid_file_is_serialization_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_secs = \"soon\"").unwrap();

        let err = ConfigService::load_file(file.path()).unwrap_err();
        assert!(matches!(err, SpaceKnowError::Serialization { ref format, .. } if format == "TOML"));
    }

    #[test]
    fn test_env_overrides_and_trailing_slash() {
        let mut config = ApiConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            ENV_BASE_URL => Some("http://localhost:9000/".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.auth_url, ApiConfig::default().auth_url);
    }

    #[test]
    fn test_get_config_caches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "client_id = \"abc\"\n").unwrap();

        let service = ConfigService::with_path(&path);
        assert_eq!(service.get_config().unwrap().client_id, "abc");

        std::fs::write(&path, "client_id = \"xyz\"\n").unwrap();
        assert_eq!(service.get_config().unwrap().client_id, "abc");

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().client_id, "xyz");
    }
}
