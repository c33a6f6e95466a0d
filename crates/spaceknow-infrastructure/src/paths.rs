//! Path management for spaceknow configuration files.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Neither `$XDG_CONFIG_HOME` nor a home directory is available.
    #[error("Cannot locate a user config directory")]
    ConfigDirNotFound,
}

/// Resolves the client's on-disk locations.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/spaceknow/         # Config directory (XDG on Linux)
/// └── config.toml              # API endpoints and polling bounds
/// ```
pub struct SpaceKnowPaths;

impl SpaceKnowPaths {
    /// Returns the spaceknow configuration directory (e.g. `~/.config/spaceknow/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("spaceknow"))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_in_config_dir() {
        if let (Ok(dir), Ok(file)) = (SpaceKnowPaths::config_dir(), SpaceKnowPaths::config_file()) {
            assert!(dir.ends_with("spaceknow"));
            assert_eq!(file.parent(), Some(dir.as_path()));
        }
    }

    #[test]
    fn test_path_error_message() {
        assert_eq!(
            PathError::ConfigDirNotFound.to_string(),
            "Cannot locate a user config directory"
        );
    }
}
