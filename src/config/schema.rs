//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the file
//! - Parsing KDL documents
//! - Validation
//! - Reading config files from disk

use kdl::{KdlDocument, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Upper bound for `event-queue-capacity`.
pub const MAX_QUEUE_CAPACITY: usize = 4096;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"  // or "json"
/// log-level "uiforge=debug"
/// event-queue-capacity 128
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiforgeConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Tracing filter directive (e.g. "warn", "uiforge=debug")
    pub log_level: Option<String>,

    /// Capacity of the per-turn event queue (1-4096)
    pub event_queue_capacity: Option<usize>,
}

impl UiforgeConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(capacity) = self.event_queue_capacity {
            if capacity == 0 || capacity > MAX_QUEUE_CAPACITY {
                return Err(format!(
                    "event-queue-capacity must be 1-{}, got {}",
                    MAX_QUEUE_CAPACITY, capacity
                ));
            }
        }
        if let Some(ref level) = self.log_level {
            if level.trim().is_empty() {
                return Err("log-level must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes are ignored. A value of the wrong type is left unset,
    /// except `event-queue-capacity`, which is kept so validation can
    /// report it.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_value(doc, "output-format").and_then(KdlValue::as_string) {
            config.output_format = OutputFormat::parse(s);
        }

        if let Some(s) = first_value(doc, "log-level").and_then(KdlValue::as_string) {
            config.log_level = Some(s.to_string());
        }

        if let Some(i) = first_value(doc, "event-queue-capacity").and_then(KdlValue::as_integer) {
            config.event_queue_capacity = Some(usize::try_from(i).unwrap_or(0));
        }

        config
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &UiforgeConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level.clone();
        }
        if other.event_queue_capacity.is_some() {
            self.event_queue_capacity = other.event_queue_capacity;
        }
    }

    /// Read and validate a config file. A missing file is an empty config.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::InvalidInput(format!("Invalid config {}: {}", path.display(), e)))?;
        let config = Self::from_kdl(&doc);
        config
            .validate()
            .map_err(|e| Error::InvalidInput(format!("Invalid config {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}
