//! Configuration and environment paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/samples-validator/`, `~/.local/share/samples-validator/`
//! - macOS: `~/Library/Application Support/samples-validator/`
//! - Windows: `%APPDATA%\samples-validator\`

use std::path::PathBuf;

/// Name used for the config and data directories
const APP_NAME: &str = "samples-validator";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the default configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

/// Directory holding the reusable execution environments
/// (virtualenvs, node projects)
///
/// Falls back to the system temp dir when no data dir can be determined.
pub fn environments_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("environments"))
        .unwrap_or_else(std::env::temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environments_dir_is_valid() {
        let path = environments_dir();
        assert!(!path.as_os_str().is_empty());
    }

    #[test]
    fn test_config_path_is_yaml() {
        if let Some(path) = config_path() {
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("yaml"));
        }
    }
}
