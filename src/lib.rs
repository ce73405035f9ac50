//! uiforge - A virtual project workspace built by agent tool calls.
//!
//! This library provides the core functionality for the `uf` CLI tool:
//! the in-memory project tree, the tool-call interpreter that mutates it,
//! the chat session that feeds streamed tool calls to the interpreter, and
//! the migration step that attaches anonymous work to a durable project
//! after sign-in.

pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod models;
pub mod prompts;
pub mod session;
pub mod storage;
pub mod tools;
pub mod vfs;


/// Library-level error type for uiforge operations.
///
/// File-system and tool failures have their own types ([`vfs::FsError`],
/// [`tools::ToolError`]) because they are embedded in tool results rather
/// than propagated.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("A turn is already in progress")]
    TurnInProgress,

    #[error("No turn is in progress")]
    NoActiveTurn,

    #[error("Tool call {0} has already completed")]
    AlreadyCompleted(String),

    #[error("A sign-in or migration is already in progress")]
    MigrationInProgress,

    #[error("No authenticator is configured")]
    NoAuthenticator,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for uiforge operations.
pub type Result<T> = std::result::Result<T, Error>;
