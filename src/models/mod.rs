//! Data models for uiforge entities.
//!
//! This module defines the core data structures:
//! - `ChatMessage` - One transcript entry, made of ordered parts
//! - `ToolInvocation` - A structured command from the agent and its result
//! - `Project` - A durable project with its transcript and snapshot
//! - `AnonWorkBuffer` - Pending work from a session with no bound project
//! - `ProjectSnapshot` - Serialized path-to-content view of a project tree

pub mod snapshot;

pub use snapshot::{ProjectSnapshot, SnapshotEntry};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One ordered piece of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    ToolInvocation {
        #[serde(rename = "toolInvocation")]
        tool_invocation: ToolInvocation,
    },
    /// Boundary between two model steps within one assistant message
    StepStart,
}

/// A transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    /// Create a user message holding a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::User,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    /// Create an empty assistant message.
    pub fn assistant() -> Self {
        Self {
            id: new_message_id(),
            role: Role::Assistant,
            parts: Vec::new(),
        }
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Tool invocations in this message, in the order they were applied.
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.parts.iter().filter_map(|part| match part {
            MessagePart::ToolInvocation { tool_invocation } => Some(tool_invocation),
            _ => None,
        })
    }
}

fn new_message_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Lifecycle of a tool invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    #[default]
    Pending,
    Result,
}

/// Stable error category carried inside a failed tool result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidPath,
    NotFound,
    Conflict,
    AmbiguousMatch,
    InvalidLine,
    UnsupportedCommand,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidPath => "invalid_path",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::AmbiguousMatch => "ambiguous_match",
            ErrorKind::InvalidLine => "invalid_line",
            ErrorKind::UnsupportedCommand => "unsupported_command",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error payload embedded in a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of a completed tool invocation.
///
/// Failures serialize as `{"error": {"kind": ..., "message": ...}}`; any
/// other value is a success payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResult {
    Failure { error: ToolFailure },
    Success(serde_json::Value),
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        ToolResult::Success(serde_json::Value::String(output.into()))
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        ToolResult::Failure {
            error: ToolFailure {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Failure { .. })
    }

    /// The embedded failure, if this result is one.
    pub fn failure_info(&self) -> Option<&ToolFailure> {
        match self {
            ToolResult::Failure { error } => Some(error),
            ToolResult::Success(_) => None,
        }
    }
}

/// One structured command issued by the agent.
///
/// `state` and `result` are only changed through [`ToolInvocation::complete`],
/// which enforces the single pending-to-result transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub args: serde_json::Value,
    #[serde(default)]
    state: InvocationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<ToolResult>,
}

impl ToolInvocation {
    /// Create a pending invocation.
    pub fn pending(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: serde_json::Value,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
            state: InvocationState::Pending,
            result: None,
        }
    }

    /// The `command` field of the args, if present.
    pub fn command(&self) -> Option<&str> {
        self.args.get("command").and_then(|v| v.as_str())
    }

    /// The `path` field of the args, if present.
    pub fn path(&self) -> Option<&str> {
        self.args.get("path").and_then(|v| v.as_str())
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn result(&self) -> Option<&ToolResult> {
        self.result.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.state == InvocationState::Result
    }

    /// Record the result and move to the `result` state.
    ///
    /// Fails if the invocation has already completed; a result is never
    /// overwritten.
    pub fn complete(&mut self, result: ToolResult) -> crate::Result<()> {
        if self.is_complete() {
            return Err(crate::Error::AlreadyCompleted(self.tool_call_id.clone()));
        }
        self.result = Some(result);
        self.state = InvocationState::Result;
        Ok(())
    }
}

/// A durable project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (e.g., "uf-3fa9c1")
    pub id: String,

    pub name: String,

    /// Transcript at the time of the last save
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Project files at the time of the last save
    #[serde(default)]
    pub data: ProjectSnapshot,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project with the given ID from a creation request.
    pub fn new(id: String, request: NewProject) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: request.name,
            messages: request.messages,
            data: request.data,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Request to create a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub data: ProjectSnapshot,
}

/// Project listing entry, as returned by a project store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Identity of a newly created project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedProject {
    pub id: String,
}

/// Unauthenticated work awaiting migration to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonWorkBuffer {
    pub messages: Vec<ChatMessage>,
    pub file_system_data: ProjectSnapshot,
    /// When the buffer was last written; later writes win
    pub updated_at: DateTime<Utc>,
}

impl AnonWorkBuffer {
    pub fn new(messages: Vec<ChatMessage>, file_system_data: ProjectSnapshot) -> Self {
        Self {
            messages,
            file_system_data,
            updated_at: Utc::now(),
        }
    }
}
