//! Editor configuration
//!
//! Stored as pretty JSON in the platform config directory. A missing or
//! unreadable file falls back to defaults.

use crate::error::{ShortsError, ShortsResult};
use crate::export_settings::ExportSelections;
use crate::source::MediaConstraints;
use crate::storage::JsonFileStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Where the library keeps recent videos. `None` uses the platform data dir.
    pub storage_dir: Option<PathBuf>,
    /// Initial selections on the export surface
    pub export: ExportSelections,
    pub constraints: MediaConstraints,
    /// Length of a quick cut, in seconds
    pub quick_cut_secs: f64,
    pub logging: LoggingConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            export: ExportSelections::default(),
            constraints: MediaConstraints::default(),
            quick_cut_secs: 5.0,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `shorts_core=debug`
    pub level: String,
    /// Prefix each line with the emitting module
    pub show_target: bool,
    /// Colored output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_target: true,
            ansi: true,
        }
    }
}

impl EditorConfig {
    /// Load from the standard location
    pub fn load() -> Self {
        match config_file_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                warn!("{}; using default config", e);
                Self::default()
            }
        }
    }

    /// Load from `path`, falling back to defaults if it is missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => warn!("Failed to parse config at {:?}: {}", path, e),
                },
                Err(e) => warn!("Failed to read config at {:?}: {}", path, e),
            }
        }
        Self::default()
    }

    /// Open the library store at `storage_dir`, or the platform data dir if unset
    pub fn open_store(&self) -> ShortsResult<JsonFileStore> {
        match &self.storage_dir {
            Some(dir) => JsonFileStore::open(dir),
            None => JsonFileStore::open(JsonFileStore::default_dir()?),
        }
    }

    /// Save to the standard location
    pub fn save(&self) -> ShortsResult<()> {
        self.save_to(&config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> ShortsResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn config_file_path() -> ShortsResult<PathBuf> {
    directories::ProjectDirs::from("app", "shorts", "Shorts")
        .map(|dirs| dirs.config_dir().join("config.json"))
        .ok_or_else(|| ShortsError::Configuration("Could not determine config directory".into()))
}
