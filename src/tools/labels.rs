//! Short progress lines describing a tool invocation.
//!
//! Each invocation has one line while pending ("Writing App.jsx...") and one
//! once it has a result ("Wrote App.jsx").

use serde::Serialize;
use serde_json::Value;

use crate::models::ToolInvocation;
use crate::vfs::path;

/// Pending and completed wording for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressLabel {
    pub pending: String,
    pub complete: String,
}

impl ProgressLabel {
    fn new(pending: impl Into<String>, complete: impl Into<String>) -> Self {
        Self {
            pending: pending.into(),
            complete: complete.into(),
        }
    }
}

/// Last path segment, or "file" when there is no path.
fn display_name(path: Option<&str>) -> String {
    match path {
        None => "file".to_string(),
        Some(p) => match path::file_name(p) {
            "" => p.to_string(),
            name => name.to_string(),
        },
    }
}

/// Labels for a call to `tool_name` with `args`.
pub fn label_for(tool_name: &str, args: &Value) -> ProgressLabel {
    let command = args.get("command").and_then(Value::as_str);
    let path = args.get("path").and_then(Value::as_str);
    let name = display_name(path);

    match tool_name {
        "str_replace_editor" => match command {
            Some("create") => {
                ProgressLabel::new(format!("Writing {}...", name), format!("Wrote {}", name))
            }
            Some("view") => {
                ProgressLabel::new(format!("Reading {}...", name), format!("Read {}", name))
            }
            Some("str_replace") | Some("insert") => {
                ProgressLabel::new(format!("Editing {}...", name), format!("Edited {}", name))
            }
            _ => ProgressLabel::new(format!("Working on {}...", name), format!("Updated {}", name)),
        },
        "file_manager" => match command {
            Some("rename") => {
                let new_name = display_name(args.get("new_path").and_then(Value::as_str));
                ProgressLabel::new("Renaming file...", format!("Renamed to {}", new_name))
            }
            Some("delete") => ProgressLabel::new("Removing file...", "Removed file"),
            _ => ProgressLabel::new("Processing file...", "Done"),
        },
        _ => ProgressLabel::new("Working...", "Done"),
    }
}

/// The line to show for an invocation in its current state.
pub fn status_line(invocation: &ToolInvocation) -> String {
    let label = label_for(&invocation.tool_name, &invocation.args);
    if invocation.is_complete() {
        label.complete
    } else {
        label.pending
    }
}
