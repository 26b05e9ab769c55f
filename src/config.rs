//! Configuration Management
//!
//! Handles persistent configuration storage for armgen.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::azure::client::{DEFAULT_ENDPOINT, DEFAULT_POLL_INTERVAL};

/// Environment variable overriding the Resource Manager endpoint
pub const ENDPOINT_ENV_VAR: &str = "ARM_ENDPOINT";

/// Per-operation timeouts, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub create_secs: u64,
    pub read_secs: u64,
    pub update_secs: u64,
    pub delete_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create_secs: 30 * 60,
            read_secs: 5 * 60,
            update_secs: 30 * 60,
            delete_secs: 30 * 60,
        }
    }
}

impl Timeouts {
    pub fn create(&self) -> Duration {
        Duration::from_secs(self.create_secs)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn update(&self) -> Duration {
        Duration::from_secs(self.update_secs)
    }

    pub fn delete(&self) -> Duration {
        Duration::from_secs(self.delete_secs)
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Resource Manager endpoint, e.g. for sovereign clouds
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Operation timeouts
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Long running operation poll interval when ARM sends no `Retry-After`
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("armgen").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config {:?}: {:#}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective endpoint (CLI > env > config > public cloud)
    pub fn effective_endpoint(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| {
                std::env::var(ENDPOINT_ENV_VAR)
                    .ok()
                    .filter(|v| !v.trim().is_empty())
            })
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    /// Set endpoint and save
    pub fn set_endpoint(&mut self, endpoint: &str) -> Result<()> {
        self.endpoint = Some(endpoint.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.read(), Duration::from_secs(300));
        assert_eq!(timeouts.create(), Duration::from_secs(1800));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"timeouts": {"read_secs": 10}}"#).unwrap();
        assert_eq!(config.timeouts.read_secs, 10);
        assert_eq!(config.timeouts.delete_secs, 1800);
        assert_eq!(config.endpoint, None);
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            endpoint: Some("https://management.usgovcloudapi.net".to_string()),
            timeouts: Timeouts {
                read_secs: 42,
                ..Timeouts::default()
            },
            poll_interval_secs: Some(1),
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_cli_endpoint_wins() {
        let config = Config {
            endpoint: Some("https://from-config".to_string()),
            ..Config::default()
        };
        assert_eq!(config.effective_endpoint(Some("https://from-cli")), "https://from-cli");
    }
}
