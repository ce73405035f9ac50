//! Configuration for uiforge.
//!
//! ## config.kdl - User preferences
//!
//! Located at:
//! - System: `~/.config/uiforge/config.kdl`
//! - Data directory: `~/.local/share/uiforge/config.kdl` (or `--data-dir`)
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `log-level` - tracing filter directive
//! - `event-queue-capacity` - per-turn event queue size (1-4096)
//!
//! ## Precedence
//!
//! CLI flag > environment variable > data-directory config > system config > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, LOG_LEVEL_ENV, OUTPUT_FORMAT_ENV, QUEUE_CAPACITY_ENV, Resolved, ResolvedConfig,
    ValueSource, resolve_config, resolve_with,
};
pub use schema::{MAX_QUEUE_CAPACITY, OutputFormat, UiforgeConfig};
