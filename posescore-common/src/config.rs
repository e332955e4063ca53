//! Configuration loading and config file resolution
//!
//! Bootstrap settings live in a small TOML file. Every field has a
//! built-in default, so a missing file is never fatal.
//!
//! # Config File Priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `POSESCORE_CONFIG` environment variable
//! 3. `<config dir>/posescore/config.toml`
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "POSESCORE_CONFIG";

/// How the composite score treats partial scores that the service omitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Divide by the sum of the weights of the scores actually present
    #[default]
    Renormalized,
    /// Always apply the full weights; a missing score counts as zero
    Fixed,
}

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the scoring service (without the `/analyze_images` path)
    #[serde(default = "default_scorer_url")]
    pub scorer_url: String,

    /// Pause after the stream opens before the countdown starts
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,

    /// Visible countdown length in whole seconds
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,

    /// Composite score weighting strategy
    #[serde(default)]
    pub weighting: Weighting,

    /// Optional HTTP client timeout; absent means wait on the transport
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Camera source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Image file served as the camera feed; synthetic pattern when absent
    #[serde(default)]
    pub source_image: Option<PathBuf>,

    /// Synthetic pattern width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Synthetic pattern height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_scorer_url() -> String {
    "http://localhost:7000".to_string()
}

fn default_warmup_ms() -> u64 {
    500
}

fn default_countdown_secs() -> u32 {
    5
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            source_image: None,
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            scorer_url: default_scorer_url(),
            warmup_ms: default_warmup_ms(),
            countdown_secs: default_countdown_secs(),
            weighting: Weighting::default(),
            request_timeout_secs: None,
            device: DeviceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file that must exist
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject values that would make the booth unusable
    pub fn validate(&self) -> Result<()> {
        if self.scorer_url.trim().is_empty() {
            return Err(Error::Config("scorer_url must not be empty".to_string()));
        }
        if !self.scorer_url.starts_with("http://") && !self.scorer_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "scorer_url must be an http(s) URL, got '{}'",
                self.scorer_url
            )));
        }
        if self.device.width == 0 || self.device.height == 0 {
            return Err(Error::Config("device width and height must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Full URL of the analysis endpoint
    pub fn analyze_url(&self) -> String {
        format!("{}/analyze_images", self.scorer_url.trim_end_matches('/'))
    }
}

/// Resolves which config file (if any) to load
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Pick the config file path by priority; `None` means use defaults
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Per-user config directory
        default_config_path().filter(|p| p.exists())
    }

    /// Load configuration with graceful degradation
    ///
    /// A missing file logs a warning and falls back to defaults. A file
    /// that exists but does not parse is an error.
    pub fn load(&self) -> Result<TomlConfig> {
        let Some(path) = self.resolve_path() else {
            info!("No config file found, using built-in defaults");
            return Ok(TomlConfig::default());
        };

        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using built-in defaults");
            return Ok(TomlConfig::default());
        }

        let config = TomlConfig::load_file(&path).map_err(|e| {
            Error::Config(format!("Failed to load {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

/// Platform config file location (`~/.config/posescore/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("posescore").join("config.toml"))
}
