//! Application settings persistence for SyntaxForge.
//!
//! Stores user preferences (data directory, default language) in a JSON file
//! at an OS-appropriate location.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use syntaxforge_core::DEFAULT_LANGUAGE;

/// File name of the snapshot store inside the data directory.
pub const DATABASE_FILE: &str = "syntaxforge.db";

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Directory holding the snapshot store.
    pub data_directory: String,
    /// Language tag for new files whose extension is not recognised.
    pub default_language: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory().to_string_lossy().to_string(),
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl AppSettings {
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.data_directory).join(DATABASE_FILE)
    }
}

/// Returns the path to the settings JSON file.
///
/// - macOS / Linux: `~/.config/syntaxforge/settings.json`
/// - Windows: `%APPDATA%/SyntaxForge/settings.json`
pub fn settings_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("SyntaxForge").join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("syntaxforge").join("settings.json")
    }
}

/// Returns the default data directory: `~/Documents/SyntaxForge`.
pub fn default_data_directory() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Documents")
        })
        .join("SyntaxForge")
}

/// Loads settings from disk; returns defaults if the file is missing or corrupt.
pub fn load_settings() -> AppSettings {
    load_settings_from(&settings_file_path())
}

pub fn load_settings_from(path: &Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring corrupt settings file {}: {e}", path.display());
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    }
}

/// Saves settings to `path`, creating parent directories as needed.
pub fn save_settings_to(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create settings directory")?;
    }
    let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path, json).context("Failed to write settings")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings_from(&dir.path().join("settings.json"));
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.default_language, "javascript");
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = AppSettings {
            data_directory: "/tmp/forge".to_string(),
            default_language: "rust".to_string(),
        };
        save_settings_to(&path, &settings).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"dataDirectory\""));
        assert_eq!(load_settings_from(&path), settings);
        assert_eq!(settings.database_path(), PathBuf::from("/tmp/forge/syntaxforge.db"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"defaultLanguage":"python"}"#).unwrap();
        let settings = load_settings_from(&path);
        assert_eq!(settings.default_language, "python");
        assert_eq!(settings.data_directory, AppSettings::default().data_directory);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{{{").unwrap();
        assert_eq!(load_settings_from(&path), AppSettings::default());
    }
}
