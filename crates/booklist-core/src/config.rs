//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/booklist/config.toml)
//! 3. Environment variables (BOOKLIST_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
const ENV_PREFIX: &str = "BOOKLIST";

/// Name of the snapshot file inside the data directory
pub const SNAPSHOT_FILENAME: &str = "data.json";

/// Default seconds between autosave checks
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 2;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (snapshot, backup, per-book files)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Seconds between autosave checks
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,

    /// Resize uploaded covers and generate previews
    ///
    /// Ignored when the image codec is not compiled in.
    #[serde(default = "default_true")]
    pub resize_covers: bool,

    /// Log file for the CLI (stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            resize_covers: true,
            log_file: None,
        }
    }
}

impl Config {
    /// Configuration rooted at a specific data directory, everything else default
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (BOOKLIST_DATA_DIR, BOOKLIST_AUTOSAVE_INTERVAL, BOOKLIST_RESIZE_COVERS)
    /// 2. Config file (~/.config/booklist/config.toml or BOOKLIST_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit config file path when given
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // BOOKLIST_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // BOOKLIST_AUTOSAVE_INTERVAL
        if let Ok(val) = std::env::var(format!("{}_AUTOSAVE_INTERVAL", ENV_PREFIX)) {
            if let Ok(secs) = val.trim().parse::<u64>() {
                self.autosave_interval_secs = secs;
            }
        }

        // BOOKLIST_RESIZE_COVERS
        if let Ok(val) = std::env::var(format!("{}_RESIZE_COVERS", ENV_PREFIX)) {
            self.resize_covers = val.eq_ignore_ascii_case("true") || val == "1";
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with BOOKLIST_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("booklist")
            .join("config.toml")
    }

    /// Autosave interval as a duration (never zero)
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs.max(1))
    }

    /// Get the path to the snapshot file
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILENAME)
    }

    /// Get the path to the snapshot backup
    pub fn backup_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.bak", SNAPSHOT_FILENAME))
    }

    /// Get the directory holding every book's files
    pub fn books_dir(&self) -> PathBuf {
        self.data_dir.join("books")
    }

    /// Get the directory holding one book's cover and attachments
    pub fn book_dir(&self, book_id: &str) -> PathBuf {
        self.books_dir().join(book_id)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("booklist")
}

fn default_autosave_interval() -> u64 {
    DEFAULT_AUTOSAVE_INTERVAL_SECS
}

fn default_true() -> bool {
    true
}
