//! Shell settings
//!
//! Stored as JSON at `<config dir>/dbtabs/settings.json`. Every section
//! falls back to its defaults, so a partial file is fine.

use anyhow::{Context, Result};
use dbtabs_storage::{DEFAULT_NAMESPACE, KeyValueStore, MemoryStore, SqliteStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    pub storage: StorageSettings,
    /// Prefix of every saved tab record key
    pub namespace: String,
    /// Connection id to SQLite database file, used by `run`
    pub connections: BTreeMap<String, PathBuf>,
    pub logging: LogPreset,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            connections: BTreeMap::new(),
            logging: LogPreset::default(),
        }
    }
}

impl ShellSettings {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings JSON in {:?}", path))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not find config directory")?;
        Ok(config_dir.join("dbtabs").join("settings.json"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// SQLite file for saved tabs; defaults to `<data dir>/dbtabs/tabs.db`
    pub path: Option<PathBuf>,
}

impl StorageSettings {
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => {
                let data_dir = dirs::data_dir().context("Could not find data directory")?;
                Ok(data_dir.join("dbtabs").join("tabs.db"))
            }
        }
    }

    /// Open the configured backend
    pub fn open(&self) -> Result<Box<dyn KeyValueStore>> {
        match self.backend {
            StorageBackend::Memory => Ok(Box::new(MemoryStore::new())),
            StorageBackend::Sqlite => {
                let path = self.resolved_path()?;
                let store = SqliteStore::open(&path)
                    .with_context(|| format!("Failed to open tab store at {:?}", path))?;
                Ok(Box::new(store))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogPreset {
    Development,
    #[default]
    Production,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ShellSettings::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, ShellSettings::default());
        assert_eq!(settings.namespace, "dbtabs-tabs");
        assert_eq!(settings.storage.backend, StorageBackend::Sqlite);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"storage": {"backend": "memory"}, "connections": {"local": "/tmp/app.db"}}"#,
        )
        .unwrap();

        let settings = ShellSettings::load_from(&path).unwrap();
        assert_eq!(settings.storage.backend, StorageBackend::Memory);
        assert_eq!(settings.storage.path, None);
        assert_eq!(settings.namespace, DEFAULT_NAMESPACE);
        assert_eq!(
            settings.connections.get("local"),
            Some(&PathBuf::from("/tmp/app.db"))
        );
        assert_eq!(settings.logging, LogPreset::Production);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();

        let err = ShellSettings::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings JSON"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = ShellSettings::default();
        settings.namespace = "work".into();
        settings.logging = LogPreset::Development;
        settings.storage.path = Some(dir.path().join("tabs.db"));

        settings.save_to(&path).unwrap();
        assert_eq!(ShellSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_open_sqlite_backend_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageSettings {
            backend: StorageBackend::Sqlite,
            path: Some(dir.path().join("data").join("tabs.db")),
        };
        let store = storage.open().unwrap();
        store.set("k", "v").unwrap();
        assert!(dir.path().join("data").join("tabs.db").exists());
    }
}
