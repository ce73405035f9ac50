//! Tool-call interpreter.
//!
//! Translates one agent tool invocation into virtual file system operations:
//!
//! | tool               | command     | effect                                  |
//! |--------------------|-------------|-----------------------------------------|
//! | str_replace_editor | create      | write the file, replacing any content   |
//! | str_replace_editor | view        | read a file or list a directory         |
//! | str_replace_editor | str_replace | replace the single occurrence of a text |
//! | str_replace_editor | insert      | insert text after a given line          |
//! | file_manager       | rename      | move a file or directory                |
//! | file_manager       | delete      | remove a file or directory              |
//!
//! Failures never escape this layer: [`run_invocation`] records them in the
//! invocation's result so the agent can see them and try again.

pub mod command;
pub mod labels;

pub use command::{ToolCommand, ToolName};
pub use labels::{ProgressLabel, label_for, status_line};

use serde::Serialize;
use serde_json::Value;

use crate::models::{ErrorKind, ToolInvocation, ToolResult};
use crate::vfs::{FsError, VirtualFileSystem};

/// Interpreter failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("Unsupported command '{command}' for tool '{tool}'")]
    UnsupportedCommand { tool: String, command: String },

    #[error("Malformed arguments for {tool} {command}: {reason}")]
    MalformedArgs {
        tool: String,
        command: String,
        reason: String,
    },
}

impl ToolError {
    pub(crate) fn malformed(tool: ToolName, command: &str, reason: impl Into<String>) -> Self {
        ToolError::MalformedArgs {
            tool: tool.as_str().to_string(),
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::Fs(e) => e.kind(),
            ToolError::UnsupportedCommand { .. } | ToolError::MalformedArgs { .. } => {
                ErrorKind::UnsupportedCommand
            }
        }
    }

    /// Embed this error in a tool result.
    pub fn to_result(&self) -> ToolResult {
        ToolResult::failure(self.kind(), self.to_string())
    }
}

/// Parse and run one tool call, returning its success output.
pub fn execute(
    fs: &mut VirtualFileSystem,
    tool_name: &str,
    args: &Value,
) -> Result<String, ToolError> {
    let command = ToolCommand::parse(tool_name, args)?;
    run(fs, command)
}

/// Run a validated command.
pub fn run(fs: &mut VirtualFileSystem, command: ToolCommand) -> Result<String, ToolError> {
    match command {
        ToolCommand::Create { path, content } => {
            fs.write(&path, content)?;
            Ok(format!("File created: {}", path))
        }
        ToolCommand::View { path, range } => view(fs, &path, range),
        ToolCommand::StrReplace {
            path,
            old_str,
            new_str,
        } => {
            fs.replace_unique(&path, &old_str, &new_str)?;
            Ok(format!("Replaced 1 occurrence in {}", path))
        }
        ToolCommand::Insert { path, line, text } => {
            fs.insert_lines(&path, line, &text)?;
            Ok(format!("Text inserted at line {} in {}", line, path))
        }
        ToolCommand::Rename { path, new_path } => {
            let moved = fs.rename(&path, &new_path)?;
            if moved.len() == 1 {
                Ok(format!("Renamed {} to {}", path, new_path))
            } else {
                Ok(format!("Renamed {} to {} ({} files)", path, new_path, moved.len()))
            }
        }
        ToolCommand::Delete { path } => {
            let removed = fs.remove(&path)?;
            if removed.len() == 1 {
                Ok(format!("Deleted {}", path))
            } else {
                Ok(format!("Deleted {} ({} files)", path, removed.len()))
            }
        }
    }
}

fn view(
    fs: &VirtualFileSystem,
    path: &str,
    range: Option<(i64, i64)>,
) -> Result<String, ToolError> {
    let is_root = crate::vfs::path::normalize_dir(path).is_ok_and(|p| p == crate::vfs::path::ROOT);
    if is_root || (!fs.exists(path) && fs.is_dir(path)) {
        let listing = fs
            .list_dir(path)?
            .into_iter()
            .map(|entry| match entry.kind {
                crate::vfs::EntryKind::Directory => format!("[DIR] {}", entry.path),
                crate::vfs::EntryKind::File => format!("[FILE] {}", entry.path),
            })
            .collect::<Vec<_>>();
        return Ok(listing.join("\n"));
    }

    let content = fs.read(path)?;
    let Some((start, end)) = range else {
        return Ok(content.to_string());
    };

    let lines: Vec<&str> = content.lines().collect();
    let invalid = || {
        ToolError::Fs(FsError::InvalidLine {
            path: path.to_string(),
            line: start,
            line_count: lines.len(),
        })
    };
    if start < 1 || start as usize > lines.len().max(1) {
        return Err(invalid());
    }
    let last = if end == -1 {
        lines.len()
    } else if end < start {
        return Err(invalid());
    } else {
        (end as usize).min(lines.len())
    };
    let first = start as usize - 1;
    Ok(lines.get(first..last).map(|s| s.join("\n")).unwrap_or_default())
}

/// Run a pending invocation against `fs` and record its result.
///
/// Tool failures become the invocation's result; only an attempt to complete
/// an already-completed invocation is an error.
pub fn run_invocation(
    fs: &mut VirtualFileSystem,
    invocation: &mut ToolInvocation,
) -> crate::Result<()> {
    if invocation.is_complete() {
        return Err(crate::Error::AlreadyCompleted(invocation.tool_call_id.clone()));
    }

    let result = match execute(fs, &invocation.tool_name, &invocation.args) {
        Ok(output) => {
            tracing::debug!(
                tool = %invocation.tool_name,
                command = invocation.command().unwrap_or("?"),
                "tool call applied"
            );
            ToolResult::success(output)
        }
        Err(e) => {
            tracing::debug!(
                tool = %invocation.tool_name,
                kind = %e.kind(),
                error = %e,
                "tool call failed"
            );
            e.to_result()
        }
    };
    invocation.complete(result)
}

/// Tool definition for the manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub commands: &'static [&'static str],
}

/// Get all available tools.
pub fn get_tools() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "str_replace_editor",
            description: "Create, view and edit text files in the project",
            commands: &["create", "view", "str_replace", "insert"],
        },
        ToolDef {
            name: "file_manager",
            description: "Rename or delete files and directories in the project",
            commands: &["rename", "delete"],
        },
    ]
}
