//! Configuration Management
//!
//! Handles persistent configuration storage for gcfbridge.

use crate::gcp::client::ClientConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_REGION: &str = "us-central1";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Last used project ID
    #[serde(default)]
    pub project_id: Option<String>,
    /// Last used region
    #[serde(default)]
    pub region: Option<String>,
    /// Cloud Functions API origin override (emulators, private endpoints)
    #[serde(default)]
    pub functions_origin: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcfbridge").join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load configuration from `path`; a missing or corrupt file yields defaults
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                tracing::warn!("Ignoring invalid config file {:?}: {}", path, err);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective project (config > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Get effective region (config > gcloud default > us-central1)
    pub fn effective_region(&self) -> String {
        self.region
            .clone()
            .or_else(crate::gcp::auth::get_default_region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// API client settings with any overrides applied
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default();
        if let Some(origin) = &self.functions_origin {
            config.origin = origin.clone();
        }
        if let Some(api_version) = &self.api_version {
            config.api_version = api_version.clone();
        }
        config
    }

    /// Set project and save
    pub fn set_project(&mut self, project_id: &str) -> Result<()> {
        self.project_id = Some(project_id.to_string());
        self.save()
    }

    /// Set region and save
    pub fn set_region(&mut self, region: &str) -> Result<()> {
        self.region = Some(region.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("gcfbridge-test-{}-{}", std::process::id(), name))
            .join("config.json")
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_path("roundtrip");
        let config = Config {
            project_id: Some("my-project".to_string()),
            region: Some("europe-west1".to_string()),
            functions_origin: None,
            api_version: Some("v2".to_string()),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_or_corrupt_file_yields_defaults() {
        let path = temp_path("corrupt");
        assert_eq!(Config::load_from(&path), Config::default());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_client_config_overrides() {
        let config = Config {
            functions_origin: Some("http://localhost:5001".to_string()),
            ..Config::default()
        };
        let client = config.client_config();
        assert_eq!(client.origin, "http://localhost:5001");
        assert_eq!(client.api_version, "v2alpha");

        assert_eq!(Config::default().client_config(), ClientConfig::default());
    }

    #[test]
    fn test_configured_region_wins() {
        let config = Config {
            region: Some("asia-east1".to_string()),
            ..Config::default()
        };
        assert_eq!(config.effective_region(), "asia-east1");
    }
}
