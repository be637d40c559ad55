//! Application configuration loaded from `~/.config/billar/config.toml`
//! and `BILLAR__*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::preferences::PreferencesStore;

const CONFIG_FILE: &str = "billar/config.toml";

const DEFAULT_CONFIG: &str = r#"# Billar configuration.

# Where table preferences (table id, camera URL, price, name) are stored.
# preferences_path = "/home/me/.config/billar/preferences.json"

# Session tick period in milliseconds.
tick_interval_ms = 1000

[api]
# Remote session API. Disabled unless a backend is available.
enabled = false
base_url = "http://localhost:8080/"
timeout_secs = 10
"#;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Preference file backing the table settings.
    pub preferences_path: PathBuf,
    /// Session tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Remote session API.
    pub api: ApiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preferences_path: PreferencesStore::default_path(),
            tick_interval_ms: 1000,
            api: ApiConfig::default(),
        }
    }
}

/// Remote session API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// When false, no remote calls are made.
    pub enabled: bool,
    /// Base URL, e.g. `http://localhost:8080/`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8080/".to_string(),
            timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Load from the default config path plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path` plus environment overrides. A missing file yields
    /// defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("BILLAR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to load config {}", path.display()))?;
        settings
            .try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Tick period, never shorter than 10ms.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(10))
    }

    /// Store for the configured preferences file.
    pub fn preferences_store(&self) -> PreferencesStore {
        PreferencesStore::new(&self.preferences_path)
    }
}

/// Path of the config file under the user's config directory.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE)
}

/// Write the commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    ensure_default_config_at(config_path())
}

fn ensure_default_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.tick_interval_ms, 1000);
        assert!(!config.api.enabled);
        Ok(())
    }

    #[test]
    fn reads_toml_and_fills_gaps() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
preferences_path = "/tmp/billar-prefs.json"

[api]
enabled = true
base_url = "http://pos.local/"
"#,
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.preferences_path, PathBuf::from("/tmp/billar-prefs.json"));
        assert_eq!(config.tick_interval_ms, 1000);
        assert!(config.api.enabled);
        assert_eq!(config.api.base_url, "http://pos.local/");
        assert_eq!(config.api.timeout_secs, 10);
        Ok(())
    }

    #[test]
    fn default_file_is_written_once_and_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("billar/config.toml");
        ensure_default_config_at(&path)?;
        assert!(path.exists());

        fs::write(&path, "tick_interval_ms = 250\n")?;
        ensure_default_config_at(&path)?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.tick_period(), Duration::from_millis(250));
        Ok(())
    }

    #[test]
    fn shipped_default_config_is_valid() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        ensure_default_config_at(&path)?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.api, ApiConfig::default());
        Ok(())
    }
}
