//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`UF_OUTPUT_FORMAT`, `UF_LOG`, `UF_QUEUE_CAPACITY`)
//! 3. Data-directory config.kdl (`~/.local/share/uiforge/config.kdl`)
//! 4. System config.kdl (`~/.config/uiforge/config.kdl`)
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

use crate::Result;
use crate::chat::DEFAULT_QUEUE_CAPACITY;
use crate::config::{OutputFormat, UiforgeConfig};

/// Environment variable for the output format.
pub const OUTPUT_FORMAT_ENV: &str = "UF_OUTPUT_FORMAT";
/// Environment variable for the tracing filter directive.
pub const LOG_LEVEL_ENV: &str = "UF_LOG";
/// Environment variable for the event queue capacity.
pub const QUEUE_CAPACITY_ENV: &str = "UF_QUEUE_CAPACITY";

/// Log level used when nothing else is configured.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the data-directory config.kdl
    DataDir,
    /// Value from the system config.kdl
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::DataDir => write!(f, "data-dir"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    pub log_level: Resolved<String>,
    pub event_queue_capacity: Resolved<usize>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            log_level: Resolved::new(DEFAULT_LOG_LEVEL.to_string(), ValueSource::Default),
            event_queue_capacity: Resolved::new(DEFAULT_QUEUE_CAPACITY, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn log_level(&self) -> &str {
        &self.log_level.value
    }

    pub fn event_queue_capacity(&self) -> usize {
        self.event_queue_capacity.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
    pub log_level: Option<String>,
    pub event_queue_capacity: Option<usize>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = Some(capacity);
        self
    }
}

/// Path of the system config file, if the platform has a config directory.
pub fn system_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("uiforge").join("config.kdl"))
}

/// Path of the data-directory config file.
pub fn data_dir_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.kdl")
}

/// Resolve configuration from the config files, process environment and CLI.
pub fn resolve_config(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = match system_config_path() {
        Some(path) => UiforgeConfig::read(&path)?,
        None => UiforgeConfig::new(),
    };
    let data = UiforgeConfig::read(&data_dir_config_path(data_dir))?;
    Ok(resolve_with(&system, &data, |name| std::env::var(name).ok(), overrides))
}

/// Resolve configuration from already-loaded layers.
///
/// `env` looks up an environment variable; empty and unparseable values are
/// skipped.
pub fn resolve_with(
    system: &UiforgeConfig,
    data_dir: &UiforgeConfig,
    env: impl Fn(&str) -> Option<String>,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();
    let env_var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    // Resolve output_format
    if let Some(format) = overrides.output_format {
        result.output_format = Resolved::new(format, ValueSource::CliFlag);
    } else if let Some(format) = env_var(OUTPUT_FORMAT_ENV).and_then(|v| OutputFormat::parse(&v)) {
        result.output_format =
            Resolved::new(format, ValueSource::EnvVar(OUTPUT_FORMAT_ENV.to_string()));
    } else if let Some(format) = data_dir.output_format {
        result.output_format = Resolved::new(format, ValueSource::DataDir);
    } else if let Some(format) = system.output_format {
        result.output_format = Resolved::new(format, ValueSource::System);
    }

    // Resolve log_level
    if let Some(ref level) = overrides.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::CliFlag);
    } else if let Some(level) = env_var(LOG_LEVEL_ENV) {
        result.log_level = Resolved::new(level, ValueSource::EnvVar(LOG_LEVEL_ENV.to_string()));
    } else if let Some(ref level) = data_dir.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::DataDir);
    } else if let Some(ref level) = system.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::System);
    }

    // Resolve event_queue_capacity
    let env_capacity = env_var(QUEUE_CAPACITY_ENV)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|c| (1..=super::schema::MAX_QUEUE_CAPACITY).contains(c));
    if let Some(capacity) = overrides.event_queue_capacity {
        result.event_queue_capacity = Resolved::new(capacity, ValueSource::CliFlag);
    } else if let Some(capacity) = env_capacity {
        result.event_queue_capacity =
            Resolved::new(capacity, ValueSource::EnvVar(QUEUE_CAPACITY_ENV.to_string()));
    } else if let Some(capacity) = data_dir.event_queue_capacity {
        result.event_queue_capacity = Resolved::new(capacity, ValueSource::DataDir);
    } else if let Some(capacity) = system.event_queue_capacity {
        result.event_queue_capacity = Resolved::new(capacity, ValueSource::System);
    }

    result
}
