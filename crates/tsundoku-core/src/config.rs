use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TsundokuError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub appearance: AppearanceConfig,
    pub library: LibraryConfig,
    pub downloads: DownloadsConfig,
    pub privacy: PrivacyConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceConfig {
    pub color_theme: ColorTheme,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub storage_folder: Option<PathBuf>,
    #[serde(default)]
    pub sd_storage_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadsConfig {
    pub threads_quantity_lists: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyConfig {
    pub app_preview: bool,
    pub analytics: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub app_lock: bool,
}

/// Color theme preference. `System` follows the OS light/dark setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTheme {
    #[default]
    Light,
    Dark,
    Black,
    System,
}

impl ColorTheme {
    pub const ALL: &[ColorTheme] = &[Self::Light, Self::Dark, Self::Black, Self::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Black => "black",
            Self::System => "system",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "black" => Some(Self::Black),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for ColorTheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppConfig {
    /// Load config from `path` if it exists, otherwise the built-in defaults.
    pub fn load_from(path: &Path) -> Result<Self, TsundokuError> {
        if !path.exists() {
            return Self::defaults();
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| TsundokuError::Config(e.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), TsundokuError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TsundokuError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Path to the database file.
    pub fn db_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("tsundoku.db"))
            .unwrap_or_else(|| PathBuf::from("tsundoku.db"))
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path() -> Result<PathBuf, TsundokuError> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn defaults() -> Result<Self, TsundokuError> {
        toml::from_str(DEFAULT_CONFIG).map_err(|e| TsundokuError::Config(e.to_string()))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "tsundoku")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::defaults().expect("built-in default config is valid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = AppConfig::default();
        assert_eq!(config.appearance.color_theme, ColorTheme::Light);
        assert_eq!(config.downloads.threads_quantity_lists, 0);
        assert!(config.privacy.analytics);
        assert!(!config.security.app_lock);
        assert!(config.library.storage_folder.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.appearance.color_theme = ColorTheme::Black;
        config.library.storage_folder = Some(dir.path().join("books"));
        config.save_to(&path).unwrap();

        let reloaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_color_theme_parse() {
        assert_eq!(ColorTheme::from_str_opt(" Dark "), Some(ColorTheme::Dark));
        assert_eq!(ColorTheme::from_str_opt("sepia"), None);
        for theme in ColorTheme::ALL {
            assert_eq!(ColorTheme::from_str_opt(theme.as_str()), Some(*theme));
        }
    }
}
