//! Engine settings derived from the bootstrap TOML configuration

use std::time::Duration;

use docimp_common::config::{AnalysisConfig, TomlConfig};

use crate::services::CategoryPolicy;

/// Content analysis scheduling and density thresholds
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Quiet period the inputs must be stable for before a pass starts
    pub debounce: Duration,
    /// Minimum duration of a forced-mode pass
    pub min_visible_delay: Duration,
    /// Documents below this many characters per page need OCR
    pub min_chars_per_page: f64,
    /// Documents below this many characters in total need OCR
    pub min_total_chars: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for AnalysisSettings {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            min_visible_delay: Duration::from_millis(config.min_visible_delay_ms),
            min_chars_per_page: config.min_chars_per_page,
            min_total_chars: config.min_total_chars,
        }
    }
}

/// Everything an import session needs from configuration
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub analysis: AnalysisSettings,
    pub categories: CategoryPolicy,
}

impl From<&TomlConfig> for EngineSettings {
    fn from(config: &TomlConfig) -> Self {
        Self {
            analysis: AnalysisSettings::from(&config.analysis),
            categories: CategoryPolicy::from_config(&config.categories),
        }
    }
}
