//! Bridge configuration
//!
//! Stored in `{config_dir}/cadbridge/settings.json`. A missing or unreadable
//! file yields the defaults.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use cadbridge_engine::{BridgeOptions, PropertyPolicy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 9875;

/// Settings of the bridge server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Loopback address to listen on
    pub host: IpAddr,
    pub port: u16,
    /// Wait for the owning context, in milliseconds (0 = forever)
    pub task_timeout_ms: u64,
    pub property_policy: PropertyPolicy,
    /// Allow `execute_code` to run caller-supplied scripts
    pub allow_code_execution: bool,
    pub parts_library: Option<PathBuf>,
    pub watch_parts_library: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            task_timeout_ms: 30_000,
            property_policy: PropertyPolicy::Strict,
            allow_code_execution: false,
            parts_library: default_parts_library(),
            watch_parts_library: false,
        }
    }
}

impl BridgeConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn to_options(&self) -> BridgeOptions {
        BridgeOptions {
            policy: self.property_policy,
            allow_code_execution: self.allow_code_execution,
            task_timeout: (self.task_timeout_ms > 0).then(|| Duration::from_millis(self.task_timeout_ms)),
            parts_library: self.parts_library.clone(),
            watch_parts: self.watch_parts_library,
            ..BridgeOptions::default()
        }
    }

    /// Load from the default location
    pub fn load() -> Self {
        config_path().map_or_else(Self::default, |path| Self::load_from(&path))
    }

    /// Load from a file, returning defaults if it doesn't exist or is invalid
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let Some(path) = config_path() else {
            bail!("Could not determine config directory");
        };
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).context("Failed to write config file")
    }
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cadbridge").join("settings.json"))
}

fn default_parts_library() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("cadbridge").join("parts_library"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::load_from(&dir.path().join("none.json"));
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.addr().to_string(), "127.0.0.1:9875");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"port": 9000, "property_policy": "best_effort"}"#).unwrap();

        let config = BridgeConfig::load_from(&path);
        assert_eq!(config.port, 9000);
        assert_eq!(config.property_policy, PropertyPolicy::BestEffort);
        assert!(!config.allow_code_execution);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");
        let config = BridgeConfig {
            allow_code_execution: true,
            task_timeout_ms: 0,
            ..BridgeConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(BridgeConfig::load_from(&path), config);
        assert_eq!(config.to_options().task_timeout, None);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(BridgeConfig::load_from(&path), BridgeConfig::default());
    }
}
