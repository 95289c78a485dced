//! Editor settings.
//!
//! Stored as JSON at `~/.config/lectern/settings.json` (platform equivalent
//! via `directories`). Every field is optional in the file; anything missing
//! takes its default.

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lectern_core::DEFAULT_SNAP_MARGIN;

/// `None` when the platform has no home directory.
pub fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "Lectern", "lectern")
}

/// Default settings file location
pub fn settings_path() -> PathBuf {
    match get_project_dirs() {
        Some(dirs) => dirs.config_dir().join("settings.json"),
        None => PathBuf::from(".lectern").join("settings.json"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    /// Distance in milliseconds within which an insert snaps to a page start
    pub snap_to_page_margin_ms: i32,
    /// Keep a numbered copy of a recording before overwriting it
    pub backup_on_save: bool,
    /// Number of backups kept per recording
    pub max_backups: usize,
    /// Directory scanned by `list`; defaults to the data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recordings_dir: Option<PathBuf>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            snap_to_page_margin_ms: DEFAULT_SNAP_MARGIN,
            backup_on_save: true,
            max_backups: 5,
            recordings_dir: None,
        }
    }
}

impl EditorSettings {
    /// Load settings from `path`.
    ///
    /// A missing file yields the defaults. A file that cannot be read or
    /// parsed is reported and also yields the defaults.
    pub fn load(path: &Path) -> Self {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Failed to read settings {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&json) {
            Ok(settings) => {
                debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("Failed to parse settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Directory scanned for recordings when no directory is given.
    pub fn recordings_dir(&self) -> PathBuf {
        match &self.recordings_dir {
            Some(dir) => dir.clone(),
            None => match get_project_dirs() {
                Some(dirs) => dirs.data_dir().join("recordings"),
                None => PathBuf::from("recordings"),
            },
        }
    }
}
