//! Configuration management for Keystroke Tally
//!
//! Settings live in a platform-specific TOML file. Every section is optional;
//! anything missing takes its default.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/keystroke-tally/config.toml` |
//! | macOS | `~/Library/Application Support/keystroke-tally/config.toml` |
//! | Windows | `%APPDATA%\keystroke-tally\config.toml` |
//!
//! Counts themselves are not stored here; they go to `~/.keystroke-tally/data.json`
//! unless `storage.data_file` says otherwise.
//!
//! ## Example
//!
//! ```no_run
//! use keystroke_tally::Config;
//!
//! let mut config = Config::load().unwrap_or_default();
//! config.capture.poll_interval_ms = 5;
//! config.save().expect("Failed to save config");
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_NAME: &str = "keystroke-tally";
const DATA_DIR_NAME: &str = ".keystroke-tally";

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory
    #[error("Could not determine config directory")]
    NoConfigDir,
    /// IO error reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse config file
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize config
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Returns the path to the config file.
///
/// Creates the config directory if it doesn't exist.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join(APP_NAME);

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir.join("config.toml"))
}

/// Directory holding the counts file and the log, `~/.keystroke-tally`
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where and how counts are persisted
    #[serde(default)]
    pub storage: StorageConfig,
    /// Key capture settings
    #[serde(default)]
    pub capture: CaptureConfig,
    /// UI settings
    #[serde(default)]
    pub ui: UiConfig,
    /// Log settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Counts file; `~/.keystroke-tally/data.json` when unset
    pub data_file: Option<PathBuf>,
    /// Indentation width of the counts file
    pub indent: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            indent: 4,
        }
    }
}

impl StorageConfig {
    /// Resolved counts file path
    pub fn data_file(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(|| default_data_dir().join("data.json"))
    }
}

/// Which key source to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureBackend {
    /// evdev where readable, polling otherwise
    #[default]
    Auto,
    /// Raw `/dev/input` devices (Linux only)
    Evdev,
    /// Poll the held-key set through device_query
    Poll,
}

/// Key capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Source selection
    pub backend: CaptureBackend,
    /// How often sources check for new input, in milliseconds
    pub poll_interval_ms: u64,
    /// Count auto-repeat as presses (evdev only)
    pub count_repeats: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            backend: CaptureBackend::Auto,
            poll_interval_ms: 10,
            count_repeats: false,
        }
    }
}

impl CaptureConfig {
    /// Polling interval as Duration, never zero
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Refresh rate for UI updates (in Hz)
    pub refresh_rate_hz: u32,
    /// Color theme (dark/light)
    pub theme: Theme,
    /// Number of keys shown in the chart
    pub chart_limit: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 30,
            theme: Theme::Dark,
            chart_limit: 20,
        }
    }
}

/// Color theme options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub level: String,
    /// Log file for the TUI; `~/.keystroke-tally/keystroke-tally.log` when unset
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Resolved log file path
    pub fn file(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| default_data_dir().join("keystroke-tally.log"))
    }
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get UI refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.ui.refresh_rate_hz.max(1) as u64)
    }
}
