//! Application configuration management.
//!
//! Persisted defaults for scan settings (similarity threshold, fingerprint
//! policy, extra audio extensions) and the cache database location. CLI
//! flags override everything here per invocation.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Overall similarity threshold for grouping (0-100).
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Quick-fingerprint policy: "disabled", "on-demand", or "always".
    #[serde(default)]
    pub fingerprint: FingerprintSetting,
    /// Extra audio extensions recognized on top of the built-in list
    /// (lowercase, without the dot).
    #[serde(default)]
    pub extra_extensions: Vec<String>,
    /// Override for the cache database path.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

fn default_threshold() -> f64 {
    crate::duplicates::DEFAULT_OVERALL_THRESHOLD
}

/// Serializable mirror of [`crate::cache::FingerprintPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintSetting {
    /// Never fingerprint.
    Disabled,
    /// Fingerprint only on `--deep` scans.
    #[default]
    OnDemand,
    /// Fingerprint every staleness check.
    Always,
}

impl From<FingerprintSetting> for crate::cache::FingerprintPolicy {
    fn from(setting: FingerprintSetting) -> Self {
        match setting {
            FingerprintSetting::Disabled => Self::Disabled,
            FingerprintSetting::OnDemand => Self::OnDemand,
            FingerprintSetting::Always => Self::Always,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            fingerprint: FingerprintSetting::default(),
            extra_extensions: Vec::new(),
            cache_path: None,
        }
    }
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    ///
    /// A missing or unreadable file falls back to defaults; configuration
    /// must never prevent a scan from running.
    pub fn load() -> Self {
        match Self::load_internal() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    fn load_internal() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save the configuration to the default platform-specific path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The cache database path: the configured override, or the
    /// platform-specific default under the user cache directory.
    pub fn resolve_cache_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.cache_path {
            return Ok(path.clone());
        }
        let project_dirs = project_dirs()?;
        Ok(project_dirs.cache_dir().join("file_state.db"))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.json"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "audiodupe", "audiodupe")
        .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))
}
