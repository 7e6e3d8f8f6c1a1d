//! Application configuration for wikiport.
//!
//! User config lives at `~/.wikiport/wikiport.toml`. The config is loaded
//! once at process start and passed by value into the constructors of the
//! collaborators that need it — core logic never does ambient lookups.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WikiportError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "wikiport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".wikiport";

// ---------------------------------------------------------------------------
// Config structs (matching wikiport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Local data locations (database, blob root).
    #[serde(default)]
    pub storage: StorageConfig,

    /// GitHub access settings.
    #[serde(default)]
    pub github: GithubConfig,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the job database and stored export blobs.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.wikiport/data".into()
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Name of the env var holding the API token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Timeout in seconds for requests to the content host.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Resolved path of the job database file.
    pub fn db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir).join("wikiport.db")
    }

    /// Resolved root directory for stored export blobs.
    pub fn blob_root(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir).join("blobs")
    }

    /// Read the GitHub token from the configured env var, if set and non-empty.
    pub fn github_token(&self) -> Option<String> {
        std::env::var(&self.github.token_env)
            .ok()
            .filter(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Directory holding the user config file (`~/.wikiport`).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Full path of the user config file.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Load config from the default location, falling back to defaults if the
/// file does not exist.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_file_path())
}

/// Load config from an explicit path, falling back to defaults if missing.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|e| WikiportError::io(path, e))?;
    toml::from_str(&raw)
        .map_err(|e| WikiportError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file if none exists. Returns the path written.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path();
    if path.exists() {
        return Ok(path);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| WikiportError::io(parent, e))?;
    }

    let default = AppConfig::default();
    let rendered = toml::to_string_pretty(&default)
        .map_err(|e| WikiportError::config(format!("failed to render default config: {e}")))?;
    std::fs::write(&path, rendered).map_err(|e| WikiportError::io(&path, e))?;
    Ok(path)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.github.token_env, "GITHUB_TOKEN");
        assert_eq!(config.github.timeout_secs, 30);
        assert!(config.db_path().ends_with("wikiport.db"));
        assert!(config.blob_root().ends_with("blobs"));
    }

    #[test]
    fn parse_partial_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/var/lib/wikiport"
            "#,
        )
        .expect("parse");

        assert_eq!(config.storage.data_dir, "/var/lib/wikiport");
        // Missing sections fall back to defaults.
        assert_eq!(config.github.token_env, "GITHUB_TOKEN");
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/wikiport/wikiport.db"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("wikiport-no-such-config.toml");
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.storage.data_dir, default_data_dir());
    }
}
