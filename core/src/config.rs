use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Main configuration structure for Waterline.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub loader: LoaderConfig,

    #[serde(default)]
    pub format: FormatConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file is missing.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Failed to load config from {:?}: {}. Using defaults.",
                    path.as_ref(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Get the default configuration as a TOML string.
    pub fn default_toml() -> Result<String> {
        let config = Self::default();
        toml::to_string_pretty(&config).context("Failed to serialize default config")
    }

    /// Validate the configuration for obvious misconfiguration.
    pub fn validate(&self) -> Result<()> {
        if self.loader.page_size == 0 {
            anyhow::bail!("loader.page_size must be greater than 0");
        }

        if self.loader.max_trace_items == 0 {
            anyhow::bail!("loader.max_trace_items must be greater than 0");
        }

        if self.format.duration_threshold == 0 {
            anyhow::bail!("format.duration_threshold must be greater than 0");
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!("Invalid log level: {}", other),
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse config")?;
        Ok(config)
    }
}

/// Paginated document fetching.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderConfig {
    /// Ceiling on documents accumulated for one trace
    #[serde(default = "default_max_trace_items")]
    pub max_trace_items: usize,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_trace_items: default_max_trace_items(),
            page_size: default_page_size(),
        }
    }
}

/// Duration formatting handed to whoever renders a waterfall.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormatConfig {
    /// A unit is used once the longest duration exceeds this many of it
    #[serde(default = "default_duration_threshold")]
    pub duration_threshold: u32,

    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            duration_threshold: default_duration_threshold(),
            precision: default_precision(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub include_modules: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            include_modules: false,
        }
    }
}

// Default providers ---------------------------------------------------------

fn default_max_trace_items() -> usize {
    5_000
}

fn default_page_size() -> usize {
    1_000
}

fn default_duration_threshold() -> u32 {
    10
}

fn default_precision() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

// Tests ---------------------------------------------------------------------
