use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Built-in backend address when neither the environment nor the config file
/// says otherwise. The original client shipped with two conflicting defaults
/// (`/api` and `localhost:8000`); this is the single unified one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment override for the backend base URL.
pub const API_URL_ENV: &str = "AIRZEN_API_URL";

/// A location pinned by the user as their starting point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedLocation {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Base URL of the AirZen backend, e.g. "http://localhost:8000".
    pub api_url: Option<String>,

    /// Example TOML:
    /// [default_location]
    /// lat = 28.6139
    /// lng = 77.2090
    /// name = "New Delhi"
    pub default_location: Option<SavedLocation>,
}

impl Config {
    /// Backend base URL: environment beats config file beats built-in default.
    pub fn resolved_api_url(&self) -> String {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                return url;
            }
        }

        self.api_url.clone().unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn set_api_url(&mut self, url: impl Into<String>) {
        self.api_url = Some(url.into());
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "airzen", "airzen-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
