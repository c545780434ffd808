// Configuration Storage Service
// Handles config and calibration file read/write with version backups

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::calibration::{CalibrationConfig, CALIBRATION_SCHEMA_VERSION};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported calibration schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u64, expected: u32 },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_config_version")]
    pub version: String,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub history_dir: Option<PathBuf>,
    /// Calibration JSON to load instead of the built-in defaults.
    #[serde(default)]
    pub calibration_path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            model: ModelConfig::default(),
            history_dir: None,
            calibration_path: None,
            cache_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Base URL of the perplexity service; unset means the model is unavailable.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_inflight: default_max_inflight(),
        }
    }
}

impl AppConfig {
    /// Apply `STYLOCHECK_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = value("STYLOCHECK_MODEL_URL") {
            self.model.base_url = Some(url);
        }
        if let Some(secs) = value("STYLOCHECK_MODEL_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.model.timeout_secs = secs;
        }
        if let Some(path) = value("STYLOCHECK_CALIBRATION") {
            self.calibration_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = value("STYLOCHECK_HISTORY_DIR") {
            self.history_dir = Some(PathBuf::from(dir));
        }
    }
}

fn default_config_version() -> String { "1".to_string() }
fn default_true() -> bool { true }
fn default_timeout_secs() -> u64 { 30 }
fn default_max_inflight() -> usize { 4 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stylocheck"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(io_error(&self.config_dir))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(io_error(&self.config_file))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content).map_err(io_error(&self.config_file))
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(io_error(&backup_dir))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(io_error(&backup_file))?;

        // Keep only last 10 backups
        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(io_error(backup_dir))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Oldest first; names carry the timestamp
        entries.sort_by_key(|e| e.file_name());

        let remove_count = entries.len() - keep;
        for entry in entries.iter().take(remove_count) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }
}

/// Load and validate a calibration file. The schema version is checked before
/// the body is interpreted so older shapes fail loudly instead of half-parsing.
pub fn load_calibration(path: &Path) -> Result<CalibrationConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    parse_calibration(&content)
}

pub fn parse_calibration(content: &str) -> Result<CalibrationConfig, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let found = value
        .get("schema_version")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);
    if found != CALIBRATION_SCHEMA_VERSION as u64 {
        return Err(ConfigError::UnsupportedSchema {
            found,
            expected: CALIBRATION_SCHEMA_VERSION,
        });
    }

    let config: CalibrationConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

pub fn save_calibration(path: &Path, config: &CalibrationConfig) -> Result<(), ConfigError> {
    config.validate()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).map_err(io_error(path))
}
