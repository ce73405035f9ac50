//! CLI argument definitions for uiforge.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// uiforge - A virtual project workspace built by agent tool calls.
///
/// Apply tool calls to snapshot files, replay streamed turns, and manage
/// saved projects.
#[derive(Parser, Debug)]
#[command(name = "uf")]
#[command(
    author,
    version,
    about = "A virtual project workspace built by agent tool calls",
    long_about = None
)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Directory holding projects and config.kdl.
    /// Can also be set via UF_DATA_DIR environment variable.
    #[arg(long = "data-dir", global = true, env = "UF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter directive (e.g. "debug", "uiforge=trace").
    /// Falls back to UF_LOG, then config.kdl.
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Capacity of the per-turn event queue (1-4096).
    /// Falls back to UF_QUEUE_CAPACITY, then config.kdl.
    #[arg(
        long = "queue-capacity",
        global = true,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=4096)
    )]
    pub queue_capacity: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tool-call commands
    Tool {
        #[command(subcommand)]
        command: ToolCommands,
    },

    /// Inspect a snapshot file
    Fs {
        #[command(subcommand)]
        command: FsCommands,
    },

    /// Chat session commands
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Saved project commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Print the generation system prompt
    Prompt,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// System information commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

/// Tool subcommands
#[derive(Subcommand, Debug)]
pub enum ToolCommands {
    /// Apply one tool invocation to a snapshot file
    ///
    /// The invocation is JSON: {"toolName": "...", "args": {"command": "...", ...}}.
    /// A missing snapshot file starts from an empty project.
    Apply {
        /// Snapshot file to read and update
        #[arg(long)]
        snapshot: PathBuf,

        /// Show the result without writing the snapshot back
        #[arg(long)]
        dry_run: bool,

        /// Invocation JSON, or "-" to read from stdin
        invocation: String,
    },

    /// List the tools and their commands
    Manifest,

    /// Show the progress labels for an invocation
    Label {
        /// Invocation JSON, or "-" to read from stdin
        invocation: String,
    },
}

/// Snapshot inspection subcommands
#[derive(Subcommand, Debug)]
pub enum FsCommands {
    /// List a directory
    Ls {
        /// Snapshot file
        #[arg(long)]
        snapshot: PathBuf,

        /// Directory to list
        #[arg(default_value = "/")]
        path: String,
    },

    /// Print a file
    Cat {
        /// Snapshot file
        #[arg(long)]
        snapshot: PathBuf,

        /// File to print
        path: String,
    },
}

/// Session subcommands
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Run one chat turn from a scripted event stream
    ///
    /// Events are JSONL, one stream event per line, e.g.
    /// {"type": "tool_call", "toolCallId": "1", "toolName": "str_replace_editor", "args": {...}}
    Replay {
        /// JSONL file of stream events
        #[arg(long)]
        events: PathBuf,

        /// Snapshot file to start from and write back.
        /// Takes precedence over the project's saved files.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Saved project to resume and save back
        #[arg(long)]
        project: Option<String>,

        /// The user message that opens the turn
        #[arg(short, long, default_value = "Replay scripted turn")]
        message: String,

        /// Write anonymous work to this file (sessions without a project only)
        #[arg(long, conflicts_with = "project")]
        anon_out: Option<PathBuf>,
    },

    /// Attach anonymous work to a saved project after sign-in
    ///
    /// Saves the work in --anon as a new project, or opens the most recent
    /// project, or creates an empty one.
    Migrate {
        /// Anonymous work file written by `uf session replay --anon-out`
        #[arg(long)]
        anon: Option<PathBuf>,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List projects, most recently updated first
    List,

    /// Show a project
    Show {
        /// Project ID (e.g., uf-a1b2c3)
        id: String,
    },

    /// Create a project
    Create {
        /// Project name
        name: String,

        /// Snapshot file with the initial files
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,
}

/// System subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Show version, build and data directory information
    Info,
}

/// Package version from Cargo.toml.
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Short git commit the binary was built from.
pub fn git_commit() -> &'static str {
    env!("UF_GIT_COMMIT")
}

/// When the binary was built.
pub fn build_timestamp() -> &'static str {
    env!("UF_BUILD_TIMESTAMP")
}
