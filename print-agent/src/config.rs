//! Agent configuration
//!
//! Read once at startup from an INI file with a single `[Main]` section.
//! A handful of environment variables override the file:
//!
//! | Variable            | Key            |
//! |---------------------|----------------|
//! | `QCOS_API_URL`      | `api_url`      |
//! | `QCOS_PRINTER_PATH` | `printer_path` |
//! | `QCOS_MODEL`        | `model`        |
//! | `QCOS_LOG_LEVEL`    | `log_level`    |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, File, FileFormat, Value};
use serde::Deserialize;
use thiserror::Error;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "./qcos-printer.conf";

/// Section holding every setting
pub const SECTION: &str = "Main";

/// Largest accepted `qr_box_size`
pub const MAX_QR_BOX_SIZE: u32 = 50;

/// Largest accepted `qr_border`
pub const MAX_QR_BORDER: u32 = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("no [Main] section in {0}")]
    MissingSection(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings of a running agent
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the ticket API (e.g. `https://qcos.example/api/`)
    pub api_url: String,
    pub ticket_width: u32,
    pub ticket_height: u32,
    /// Printer model identifier (e.g. `QL-570`)
    pub model: String,
    /// Device path or `tcp://host:port`
    pub printer_path: String,

    /// Where to save a PNG copy of each rendered label
    #[serde(default)]
    pub temp_file: Option<PathBuf>,
    #[serde(default = "default_media")]
    pub media: String,
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub ack_retries: u32,
    #[serde(default = "default_ack_retry_delay_ms")]
    pub ack_retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_cut")]
    pub cut: bool,
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default = "default_qr_box_size")]
    pub qr_box_size: u32,
    #[serde(default = "default_qr_border")]
    pub qr_border: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_media() -> String {
    "62".to_string()
}

fn default_font_path() -> PathBuf {
    PathBuf::from("Verdana.ttf")
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_ack_retry_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cut() -> bool {
    true
}

fn default_threshold() -> u8 {
    128
}

fn default_qr_box_size() -> u32 {
    10
}

fn default_qr_border() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AgentConfig {
    /// Load from `path`, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Ini).required(true))
            .build()?;

        let mut config = Self::from_settings(settings, &path.display().to_string())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse INI text (no environment overrides)
    pub fn from_ini(text: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Ini))
            .build()?;
        let config = Self::from_settings(settings, "<inline>")?;
        config.validate()?;
        Ok(config)
    }

    fn from_settings(settings: Config, origin: &str) -> Result<Self, ConfigError> {
        // Section names are matched case-insensitively
        let sections: HashMap<String, Value> = settings.try_deserialize()?;
        let section = sections
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(SECTION))
            .map(|(_, value)| value)
            .ok_or_else(|| ConfigError::MissingSection(origin.to_string()))?;

        let mut config: AgentConfig = section.try_deserialize()?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        if self.temp_file.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            self.temp_file = None;
        }
        if self.log_dir.as_deref().is_some_and(|d| d.trim().is_empty()) {
            self.log_dir = None;
        }
    }

    /// Apply `QCOS_*` overrides supplied by `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("QCOS_API_URL") {
            self.api_url = url;
        }
        if let Some(path) = non_empty("QCOS_PRINTER_PATH") {
            self.printer_path = path;
        }
        if let Some(model) = non_empty("QCOS_MODEL") {
            self.model = model;
        }
        if let Some(level) = non_empty("QCOS_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url is empty".to_string()));
        }
        if self.ticket_width == 0 || self.ticket_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "ticket size must be positive, got {}x{}",
                self.ticket_width, self.ticket_height
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model is empty".to_string()));
        }
        if self.printer_path.trim().is_empty() {
            return Err(ConfigError::Invalid("printer_path is empty".to_string()));
        }
        if !(1..=MAX_QR_BOX_SIZE).contains(&self.qr_box_size) {
            return Err(ConfigError::Invalid(format!(
                "qr_box_size must be between 1 and {MAX_QR_BOX_SIZE}, got {}",
                self.qr_box_size
            )));
        }
        if self.qr_border > MAX_QR_BORDER {
            return Err(ConfigError::Invalid(format!(
                "qr_border must be at most {MAX_QR_BORDER}, got {}",
                self.qr_border
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn ack_retry_delay(&self) -> Duration {
        Duration::from_millis(self.ack_retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
