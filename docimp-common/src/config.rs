//! Bootstrap configuration loading
//!
//! Configuration file resolution priority:
//! 1. Explicit path (command-line argument or environment variable)
//! 2. User config file (`~/.config/docimp/<module>.toml`)
//! 3. Built-in defaults
//!
//! A missing or unreadable config file never terminates the service:
//! the loader logs a warning and falls back to the built-in defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// SQLite database holding the document record index
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Event bus buffer capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Content analysis scheduling and thresholds
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Remote quality analyzer / text extractor
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Category extension overrides
    #[serde(default)]
    pub categories: CategoryConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Content analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Quiet period before an analysis pass starts (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Minimum duration of a forced-mode pass (milliseconds)
    #[serde(default = "default_min_visible_delay_ms")]
    pub min_visible_delay_ms: u64,

    /// Below this density a document is treated as scanned
    #[serde(default = "default_min_chars_per_page")]
    pub min_chars_per_page: f64,

    /// Below this total a document is treated as scanned
    #[serde(default = "default_min_total_chars")]
    pub min_total_chars: usize,
}

/// Remote analyzer endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Base URL of the analysis service; absent disables remote analysis
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Per-category extension overrides
///
/// Absent lists keep the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryConfig {
    #[serde(default)]
    pub documents: Option<Vec<String>>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub spreadsheets: Option<Vec<String>>,
    /// Extensions within the adaptive category that get content analysis
    #[serde(default)]
    pub adaptive_extensions: Option<Vec<String>>,
}

fn default_bind_address() -> String {
    "127.0.0.1:5780".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_debounce_ms() -> u64 {
    400
}

fn default_min_visible_delay_ms() -> u64 {
    300
}

fn default_min_chars_per_page() -> f64 {
    100.0
}

fn default_min_total_chars() -> usize {
    200
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            database_path: None,
            event_bus_capacity: default_event_bus_capacity(),
            logging: LoggingConfig::default(),
            analysis: AnalysisConfig::default(),
            analyzer: AnalyzerConfig::default(),
            categories: CategoryConfig::default(),
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

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_visible_delay_ms: default_min_visible_delay_ms(),
            min_chars_per_page: default_min_chars_per_page(),
            min_total_chars: default_min_total_chars(),
        }
    }
}

impl TomlConfig {
    /// Database path, falling back to `<data dir>/docimp/docimp.db`
    pub fn database_path_or_default(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(default_database_path)
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// User config file location for a module (`~/.config/docimp/<module>.toml`)
pub fn user_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("docimp").join(format!("{}.toml", module_name)))
}

/// Resolve configuration with graceful degradation
///
/// An explicit path that fails to load is reported and replaced by defaults,
/// as is a malformed user config file.
pub fn resolve_config(explicit: Option<&Path>, module_name: &str) -> TomlConfig {
    let candidate = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => user_config_path(module_name).filter(|p| p.exists()),
    };

    let Some(path) = candidate else {
        info!("No config file found for {}, using built-in defaults", module_name);
        return TomlConfig::default();
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Configuration loaded from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using built-in defaults", e);
            TomlConfig::default()
        }
    }
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("docimp"))
        .unwrap_or_else(|| PathBuf::from("./docimp_data"))
        .join("docimp.db")
}
