#![allow(missing_docs)]

//! Flat key-value preferences persisted as JSON.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{
    DEFAULT_CAMERA_URL, DEFAULT_PRICE_PER_MINUTE, DEFAULT_TABLE_ID, DEFAULT_TABLE_NAME,
};

/// Location under the user's config directory.
pub const DEFAULT_PREFERENCES_FILE: &str = "billar/preferences.json";

/// Stored table preferences. Each missing key falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub table_id: String,
    pub camera_url: String,
    pub price_per_minute: f64,
    pub table_name: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            table_id: DEFAULT_TABLE_ID.to_string(),
            camera_url: DEFAULT_CAMERA_URL.to_string(),
            price_per_minute: DEFAULT_PRICE_PER_MINUTE,
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

/// File-backed preference store.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_PREFERENCES_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read preferences, substituting defaults when the file is missing or
    /// unreadable.
    pub fn load(&self) -> Preferences {
        match self.try_load() {
            Ok(Some(preferences)) => preferences,
            Ok(None) => Preferences::default(),
            Err(err) => {
                warn!(path = %self.path.display(), "failed to read preferences, using defaults: {err:#}");
                Preferences::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Preferences>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let preferences = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(preferences))
    }

    /// Persist preferences, creating parent directories if needed.
    pub fn save(&self, preferences: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialized =
            serde_json::to_vec_pretty(preferences).context("failed to serialize preferences")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = PreferencesStore::new(dir.path().join("prefs.json"));
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn save_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = PreferencesStore::new(dir.path().join("nested/prefs.json"));
        let preferences = Preferences {
            table_id: "table_9".to_string(),
            camera_url: "http://camera.local/stream".to_string(),
            price_per_minute: 7.25,
            table_name: "Mesa 9".to_string(),
        };
        store.save(&preferences)?;
        assert_eq!(store.load(), preferences);
        Ok(())
    }

    #[test]
    fn missing_keys_fall_back_individually() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{ "table_name": "Mesa 4" }"#)?;

        let loaded = PreferencesStore::new(&path).load();
        assert_eq!(loaded.table_name, "Mesa 4");
        assert_eq!(loaded.table_id, DEFAULT_TABLE_ID);
        assert_eq!(loaded.price_per_minute, DEFAULT_PRICE_PER_MINUTE);
        Ok(())
    }

    #[test]
    fn corrupt_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{ not json")?;
        assert_eq!(PreferencesStore::new(&path).load(), Preferences::default());
        Ok(())
    }
}
