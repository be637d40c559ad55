#![allow(missing_docs)]

//! Table settings exposed as observable values.

use anyhow::Result;
use tracing::info;

use crate::{
    models::TableConfig,
    preferences::{Preferences, PreferencesStore},
    signal::{Observer, Signal},
};

/// The four table values the operator configures, backed by a
/// [`PreferencesStore`]. Constructed explicitly and handed to whatever
/// composes the session and roster.
#[derive(Debug)]
pub struct TableSettings {
    store: Option<PreferencesStore>,
    table_id: Signal<String>,
    camera_url: Signal<String>,
    price_per_minute: Signal<f64>,
    table_name: Signal<String>,
}

impl TableSettings {
    /// Load settings from `store`, falling back to defaults on read errors.
    pub fn load(store: PreferencesStore) -> Self {
        let preferences = store.load();
        info!(path = %store.path().display(), table_id = %preferences.table_id, "table settings loaded");
        Self::from_preferences(Some(store), preferences)
    }

    /// Settings that live only in memory; saves never touch disk.
    pub fn in_memory(preferences: Preferences) -> Self {
        Self::from_preferences(None, preferences)
    }

    fn from_preferences(store: Option<PreferencesStore>, preferences: Preferences) -> Self {
        Self {
            store,
            table_id: Signal::new(preferences.table_id),
            camera_url: Signal::new(preferences.camera_url),
            price_per_minute: Signal::new(preferences.price_per_minute),
            table_name: Signal::new(preferences.table_name),
        }
    }

    pub fn table_id(&self) -> String {
        self.table_id.get()
    }

    pub fn camera_url(&self) -> String {
        self.camera_url.get()
    }

    pub fn price_per_minute(&self) -> f64 {
        self.price_per_minute.get()
    }

    pub fn table_name(&self) -> String {
        self.table_name.get()
    }

    /// All values combined into one configuration.
    pub fn table_config(&self) -> TableConfig {
        TableConfig {
            table_id: self.table_id(),
            camera_url: self.camera_url(),
            price_per_minute: self.price_per_minute(),
            table_name: self.table_name(),
            is_active: true,
        }
    }

    pub fn observe_table_id(&self) -> Observer<String> {
        self.table_id.observe()
    }

    pub fn observe_camera_url(&self) -> Observer<String> {
        self.camera_url.observe()
    }

    pub fn observe_price_per_minute(&self) -> Observer<f64> {
        self.price_per_minute.observe()
    }

    pub fn observe_table_name(&self) -> Observer<String> {
        self.table_name.observe()
    }

    pub fn save_table_id(&mut self, table_id: impl Into<String>) -> Result<()> {
        self.table_id.set(table_id.into());
        self.persist()
    }

    pub fn save_camera_url(&mut self, url: impl Into<String>) -> Result<()> {
        self.camera_url.set(url.into());
        self.persist()
    }

    pub fn save_price_per_minute(&mut self, price: f64) -> Result<()> {
        self.price_per_minute.set(price);
        self.persist()
    }

    pub fn save_table_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.table_name.set(name.into());
        self.persist()
    }

    pub fn save_table_config(&mut self, config: &TableConfig) -> Result<()> {
        self.table_id.set(config.table_id.clone());
        self.camera_url.set(config.camera_url.clone());
        self.price_per_minute.set(config.price_per_minute);
        self.table_name.set(config.table_name.clone());
        self.persist()
    }

    fn preferences(&self) -> Preferences {
        Preferences {
            table_id: self.table_id(),
            camera_url: self.camera_url(),
            price_per_minute: self.price_per_minute(),
            table_name: self.table_name(),
        }
    }

    fn persist(&self) -> Result<()> {
        match self.store.as_ref() {
            Some(store) => store.save(&self.preferences()),
            None => Ok(()),
        }
    }
}
