//! Boundary parsing of tool arguments.
//!
//! Arguments arrive as loosely-shaped JSON. They are parsed once, keyed by
//! `(tool, command)`, into a [`ToolCommand`] before any file operation runs.
//! Unknown pairs and malformed shapes are both reported as unsupported.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

use super::ToolError;

/// The tools the agent can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    StrReplaceEditor,
    FileManager,
}

impl ToolName {
    /// Parse a tool name as it appears on the wire.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "str_replace_editor" => Some(Self::StrReplaceEditor),
            "file_manager" => Some(Self::FileManager),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrReplaceEditor => "str_replace_editor",
            Self::FileManager => "file_manager",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated tool command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCommand {
    Create {
        path: String,
        content: String,
    },
    View {
        path: String,
        /// 1-based inclusive line range; an end of -1 means end of file
        range: Option<(i64, i64)>,
    },
    StrReplace {
        path: String,
        old_str: String,
        new_str: String,
    },
    Insert {
        path: String,
        line: usize,
        text: String,
    },
    Rename {
        path: String,
        new_path: String,
    },
    Delete {
        path: String,
    },
}

#[derive(Deserialize)]
struct CreateArgs {
    path: String,
    #[serde(default, alias = "content")]
    file_text: String,
}

#[derive(Deserialize)]
struct ViewArgs {
    path: String,
    #[serde(default)]
    view_range: Option<(i64, i64)>,
}

#[derive(Deserialize)]
struct StrReplaceArgs {
    path: String,
    old_str: String,
    #[serde(default)]
    new_str: String,
}

#[derive(Deserialize)]
struct InsertArgs {
    path: String,
    insert_line: usize,
    #[serde(alias = "content")]
    new_str: String,
}

#[derive(Deserialize)]
struct RenameArgs {
    path: String,
    new_path: String,
}

#[derive(Deserialize)]
struct DeleteArgs {
    path: String,
}

impl ToolCommand {
    /// Parse the arguments of a call to `tool_name`.
    pub fn parse(tool_name: &str, args: &Value) -> Result<Self, ToolError> {
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let Some(tool) = ToolName::parse(tool_name) else {
            return Err(ToolError::UnsupportedCommand {
                tool: tool_name.to_string(),
                command: command.to_string(),
            });
        };
        if command.is_empty() {
            return Err(ToolError::malformed(tool, "?", "missing 'command'"));
        }

        match (tool, command) {
            (ToolName::StrReplaceEditor, "create") => {
                let a: CreateArgs = decode(tool, command, args)?;
                Ok(Self::Create {
                    path: a.path,
                    content: a.file_text,
                })
            }
            (ToolName::StrReplaceEditor, "view") => {
                let a: ViewArgs = decode(tool, command, args)?;
                Ok(Self::View {
                    path: a.path,
                    range: a.view_range,
                })
            }
            (ToolName::StrReplaceEditor, "str_replace") => {
                let a: StrReplaceArgs = decode(tool, command, args)?;
                if a.old_str.is_empty() {
                    return Err(ToolError::malformed(tool, command, "'old_str' must not be empty"));
                }
                Ok(Self::StrReplace {
                    path: a.path,
                    old_str: a.old_str,
                    new_str: a.new_str,
                })
            }
            (ToolName::StrReplaceEditor, "insert") => {
                let a: InsertArgs = decode(tool, command, args)?;
                Ok(Self::Insert {
                    path: a.path,
                    line: a.insert_line,
                    text: a.new_str,
                })
            }
            (ToolName::FileManager, "rename") => {
                let a: RenameArgs = decode(tool, command, args)?;
                Ok(Self::Rename {
                    path: a.path,
                    new_path: a.new_path,
                })
            }
            (ToolName::FileManager, "delete") => {
                let a: DeleteArgs = decode(tool, command, args)?;
                Ok(Self::Delete { path: a.path })
            }
            _ => Err(ToolError::UnsupportedCommand {
                tool: tool.as_str().to_string(),
                command: command.to_string(),
            }),
        }
    }

    /// Whether running this command can change the tree.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::View { .. })
    }
}

fn decode<T: DeserializeOwned>(
    tool: ToolName,
    command: &str,
    args: &Value,
) -> Result<T, ToolError> {
    T::deserialize(args).map_err(|e| ToolError::malformed(tool, command, e.to_string()))
}
