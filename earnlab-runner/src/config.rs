//! Serializable batch configuration.
//!
//! One TOML file drives a batch run. Every field has a default, so an empty
//! file is a valid configuration (built-in universe, Yahoo prices, events
//! from `./events`).

use earnlab_core::UnknownTiming;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Smallest allowed price-window padding. Narrower windows can miss the
/// sessions bracketing an announcement next to a long market closure.
pub const MIN_WINDOW_PADDING_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Configuration for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Root of the per-run-date output directories.
    pub output_dir: PathBuf,

    /// Size of the bounded worker pool.
    pub workers: usize,

    /// Calendar days added on both sides of the announcement range when
    /// fetching prices.
    pub window_padding_days: i64,

    pub universe: UniverseConfig,
    pub events: EventsConfig,
    pub prices: PriceSourceConfig,
    pub logging: LoggingConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("earnings"),
            workers: 100,
            window_padding_days: 10,
            universe: UniverseConfig::default(),
            events: EventsConfig::default(),
            prices: PriceSourceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.window_padding_days < MIN_WINDOW_PADDING_DAYS {
            return Err(ConfigError::Invalid(format!(
                "window_padding_days must be at least {MIN_WINDOW_PADDING_DAYS}, got {}",
                self.window_padding_days
            )));
        }
        if let PriceSourceConfig::Yahoo { timeout_secs } = self.prices {
            if timeout_secs == 0 {
                return Err(ConfigError::Invalid("prices.timeout_secs must be positive".into()));
            }
        }
        tracing_subscriber::EnvFilter::try_new(&self.logging.level).map_err(|e| {
            ConfigError::Invalid(format!("logging.level '{}': {e}", self.logging.level))
        })?;
        Ok(())
    }
}

/// Where the symbol list comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UniverseConfig {
    /// Universe TOML file. `None` uses the built-in universe.
    pub file: Option<PathBuf>,

    /// Reuse the universe already resolved for the run date.
    pub use_cache: bool,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            file: None,
            use_cache: true,
        }
    }
}

/// Event source: one CSV file per symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventsConfig {
    pub dir: PathBuf,

    /// How this source's untagged announcements are attributed.
    pub unknown_timing: UnknownTiming,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("events"),
            unknown_timing: UnknownTiming::AfterClose,
        }
    }
}

/// Price source selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PriceSourceConfig {
    /// Yahoo Finance chart API.
    Yahoo {
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// Per-symbol CSV files of adjusted closes.
    Csv { dir: PathBuf },

    /// Deterministic random walk, offline only.
    Synthetic,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for PriceSourceConfig {
    fn default() -> Self {
        Self::Yahoo {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Output format of the console log.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,

    /// Also write `DEBUG.log` into the run directory.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            file: true,
        }
    }
}
