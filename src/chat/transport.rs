//! Generation transport boundary.
//!
//! A transport takes one [`OutboundRequest`] and pushes [`StreamEvent`]s into
//! the session's queue in the order the agent produced them. The session is
//! the only consumer.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::models::{ChatMessage, ProjectSnapshot};
use crate::{Error, Result};

/// One event from a streamed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Text content delta from the model
    TextDelta { text: String },

    /// Reasoning content delta
    ReasoningDelta { text: String },

    /// Start of a new model step
    StepStart,

    /// A complete tool call, ready to apply
    ToolCall {
        #[serde(alias = "toolCallId")]
        tool_call_id: String,
        #[serde(alias = "toolName")]
        tool_name: String,
        #[serde(default)]
        args: Value,
    },

    /// End of the generation
    Finish,
}

/// Body of a generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRequest {
    pub messages: Vec<ChatMessage>,
    /// Project tree as of the moment the request was built
    pub files: ProjectSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub system: &'static str,
}

/// Streams a generation for a request.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Send the events of one generation into `events`, in order.
    ///
    /// Returning an error ends the turn with status `error`. Events already
    /// sent are still applied.
    async fn stream(
        &self,
        request: OutboundRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<()>;
}

/// Transport that replays a fixed list of events.
///
/// Every request it receives is recorded, so callers can inspect what the
/// session sent.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    events: Vec<StreamEvent>,
    failure: Option<String>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    /// Parse a JSONL event script. Blank lines are skipped.
    pub fn from_jsonl(script: &str) -> Result<Self> {
        let mut events = Vec::new();
        for (i, line) in script.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event = serde_json::from_str(line)
                .map_err(|e| Error::InvalidInput(format!("event line {}: {}", i + 1, e)))?;
            events.push(event);
        }
        Ok(Self::new(events))
    }

    /// Fail with a transport error after all events are sent.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

#[async_trait]
impl GenerationTransport for ScriptedTransport {
    async fn stream(
        &self,
        request: OutboundRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        for event in &self.events {
            // The consumer hung up (cancelled or finished); nothing left to do
            if events.send(event.clone()).await.is_err() {
                return Ok(());
            }
        }

        match &self.failure {
            Some(message) => Err(Error::Transport(message.clone())),
            None => Ok(()),
        }
    }
}
