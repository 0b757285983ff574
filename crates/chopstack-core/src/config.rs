//! Run configuration: branch naming, worktree/shadow layout, cleanup
//! policy, conflict handling, and stack submission. Loaded from
//! `.chopstack/config.toml` (project-local) or `~/.config/chopstack/config.toml`.
//!
//! Structured after the settings-manager split in the teacher crate: a
//! plain `Config` data type plus a thin [`SettingsManager`] that owns the
//! filesystem path and (de)serialization.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    Auto,
    Manual,
    Fail,
}

impl Default for ConflictStrategy {
    fn default() -> Self {
        ConflictStrategy::Auto
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSubmissionConfig {
    pub enabled: bool,
    pub draft: bool,
    pub auto_merge: bool,
}

impl Default for StackSubmissionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            draft: true,
            auto_merge: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub branch_prefix: String,
    pub shadow_path: String,
    pub cleanup_on_success: bool,
    pub cleanup_on_failure: bool,
    pub conflict_strategy: ConflictStrategy,
    pub stack_submission: StackSubmissionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            branch_prefix: "chopstack/".to_string(),
            shadow_path: ".chopstack/shadows".to_string(),
            cleanup_on_success: true,
            cleanup_on_failure: false,
            conflict_strategy: ConflictStrategy::default(),
            stack_submission: StackSubmissionConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject configurations that would produce ambiguous or unsafe state
    /// on disk (empty branch prefix collides with unprefixed branches;
    /// an absolute shadow path escapes the repo it's meant to shadow).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.branch_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("branch_prefix must not be empty".into()));
        }
        if PathBuf::from(&self.shadow_path).is_absolute() {
            return Err(ConfigError::Invalid(
                "shadow_path must be relative to the repository root".into(),
            ));
        }
        Ok(())
    }

    fn default_global_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chopstack")
            .join("config.toml")
    }
}

/// Owns the on-disk location of a [`Config`] and the load/save/fallback
/// conveniences around it.
pub struct SettingsManager {
    path: PathBuf,
}

impl SettingsManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn project_local(project_root: impl Into<PathBuf>) -> Self {
        Self {
            path: project_root.into().join(".chopstack").join("config.toml"),
        }
    }

    pub fn global() -> Self {
        Self {
            path: Config::default_global_path(),
        }
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        Config::load_from(&self.path)
    }

    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_default()
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        std::fs::write(&self.path, config.to_toml()?).map_err(|e| ConfigError::Io(e.to_string()))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn empty_branch_prefix_is_rejected() {
        let mut cfg = Config::default();
        cfg.branch_prefix = "".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn absolute_shadow_path_is_rejected() {
        let mut cfg = Config::default();
        cfg.shadow_path = "/tmp/shadow".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = Config::default();
        let toml_text = cfg.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml_text).unwrap();
        assert_eq!(parsed.branch_prefix, cfg.branch_prefix);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SettingsManager::new(dir.path().join("config.toml"));
        let mut cfg = Config::default();
        cfg.cleanup_on_failure = true;
        manager.save(&cfg).unwrap();
        let loaded = manager.load().unwrap();
        assert!(loaded.cleanup_on_failure);
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let manager = SettingsManager::new("/nonexistent/path/config.toml");
        let cfg = manager.load_or_default();
        assert_eq!(cfg.branch_prefix, "chopstack/");
    }
}
