//! Chat session orchestration.
//!
//! A [`ChatSession`] owns the transcript, the streaming status and the
//! project tree. One turn runs at a time: a submission while the previous
//! turn is submitting or streaming is rejected. Events of the active turn are
//! drained from a bounded queue by a single consumer, so tool calls are
//! applied strictly in arrival order.
//!
//! Cancelling a turn stops event consumption. Tool calls that were already
//! applied stay applied.

pub mod transport;

pub use transport::{GenerationTransport, OutboundRequest, ScriptedTransport, StreamEvent};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{ChatMessage, MessagePart, ProjectSnapshot, Role, ToolInvocation};
use crate::prompts::GENERATION_PROMPT;
use crate::session::AnonWorkStore;
use crate::tools;
use crate::vfs::VirtualFileSystem;
use crate::{Error, Result};

/// Default capacity of the per-turn event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Streaming status of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    #[default]
    Ready,
    Submitting,
    Streaming,
    Error,
}

impl ChatStatus {
    /// Whether a turn is open.
    pub fn is_busy(&self) -> bool {
        matches!(self, ChatStatus::Submitting | ChatStatus::Streaming)
    }
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatStatus::Ready => write!(f, "ready"),
            ChatStatus::Submitting => write!(f, "submitting"),
            ChatStatus::Streaming => write!(f, "streaming"),
            ChatStatus::Error => write!(f, "error"),
        }
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnSummary {
    /// Assistant message produced by the turn, if any event arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub tool_calls: usize,
    pub failed_tool_calls: usize,
    pub cancelled: bool,
    pub status: ChatStatus,
}

#[derive(Debug, Default)]
struct ActiveTurn {
    /// Index of this turn's assistant message in the transcript
    assistant: Option<usize>,
    tool_calls: usize,
    failed_tool_calls: usize,
}

/// One chat session bound to one project tree.
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    status: ChatStatus,
    fs: VirtualFileSystem,
    project_id: Option<String>,
    transport: Arc<dyn GenerationTransport>,
    anon_store: Option<Arc<dyn AnonWorkStore>>,
    queue_capacity: usize,
    active: Option<ActiveTurn>,
    last_error: Option<String>,
}

impl ChatSession {
    /// Create an empty session with no bound project.
    pub fn new(transport: Arc<dyn GenerationTransport>) -> Self {
        Self {
            messages: Vec::new(),
            status: ChatStatus::Ready,
            fs: VirtualFileSystem::new(),
            project_id: None,
            transport,
            anon_store: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            active: None,
            last_error: None,
        }
    }

    /// Bind the session to a saved project.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Resume from an existing transcript.
    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Start from an existing project tree.
    pub fn with_snapshot(mut self, snapshot: &ProjectSnapshot) -> Result<Self> {
        self.fs = VirtualFileSystem::from_snapshot(snapshot)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(self)
    }

    /// Record anonymous work here while no project is bound.
    pub fn with_anon_store(mut self, store: Arc<dyn AnonWorkStore>) -> Self {
        self.anon_store = Some(store);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn status(&self) -> ChatStatus {
        self.status
    }

    pub fn file_system(&self) -> &VirtualFileSystem {
        &self.fs
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Error that ended the last failed turn.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Current project tree, serialized.
    pub fn snapshot(&self) -> ProjectSnapshot {
        self.fs.serialize()
    }

    /// Request body for the current state.
    pub fn outbound_request(&self) -> OutboundRequest {
        OutboundRequest {
            messages: self.messages.clone(),
            files: self.fs.serialize(),
            project_id: self.project_id.clone(),
            system: GENERATION_PROMPT,
        }
    }

    /// Open a turn for a user submission.
    ///
    /// Rejected while another turn is open, or if `text` is blank.
    pub fn begin_turn(&mut self, text: &str) -> Result<OutboundRequest> {
        if self.status.is_busy() {
            tracing::warn!(status = %self.status, "rejecting submission while a turn is open");
            return Err(Error::TurnInProgress);
        }
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("message is empty".to_string()));
        }

        self.messages.push(ChatMessage::user(text));
        self.status = ChatStatus::Submitting;
        self.last_error = None;
        self.active = Some(ActiveTurn::default());
        self.track_anon_work();

        tracing::info!(messages = self.messages.len(), "turn started");
        Ok(self.outbound_request())
    }

    /// Apply one event of the open turn.
    pub fn apply_event(&mut self, event: StreamEvent) -> Result<()> {
        if self.active.is_none() {
            return Err(Error::NoActiveTurn);
        }
        self.status = ChatStatus::Streaming;

        match event {
            StreamEvent::TextDelta { text } => {
                let message = self.assistant_message();
                match message.parts.last_mut() {
                    Some(MessagePart::Text { text: current }) => current.push_str(&text),
                    _ => message.parts.push(MessagePart::Text { text }),
                }
            }
            StreamEvent::ReasoningDelta { text } => {
                let message = self.assistant_message();
                match message.parts.last_mut() {
                    Some(MessagePart::Reasoning { text: current }) => current.push_str(&text),
                    _ => message.parts.push(MessagePart::Reasoning { text }),
                }
            }
            StreamEvent::StepStart => {
                self.assistant_message().parts.push(MessagePart::StepStart);
            }
            StreamEvent::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => self.apply_tool_call(tool_call_id, tool_name, args)?,
            StreamEvent::Finish => {}
        }

        self.track_anon_work();
        Ok(())
    }

    fn apply_tool_call(
        &mut self,
        tool_call_id: String,
        tool_name: String,
        args: serde_json::Value,
    ) -> Result<()> {
        let seen = self
            .messages
            .iter()
            .flat_map(|m| m.tool_invocations())
            .any(|inv| inv.tool_call_id == tool_call_id);
        if seen {
            tracing::warn!(tool_call_id = %tool_call_id, "ignoring repeated tool call");
            return Ok(());
        }

        let mut invocation = ToolInvocation::pending(tool_call_id, tool_name, args);
        tools::run_invocation(&mut self.fs, &mut invocation)?;
        let failed = invocation.result().is_some_and(|r| r.is_error());

        if let Some(turn) = self.active.as_mut() {
            turn.tool_calls += 1;
            if failed {
                turn.failed_tool_calls += 1;
            }
        }
        self.assistant_message().parts.push(MessagePart::ToolInvocation {
            tool_invocation: invocation,
        });
        Ok(())
    }

    /// Close the open turn normally.
    pub fn finish_turn(&mut self) -> Result<TurnSummary> {
        let turn = self.active.take().ok_or(Error::NoActiveTurn)?;
        self.status = ChatStatus::Ready;
        let summary = self.summarize(turn, false);
        tracing::info!(
            tool_calls = summary.tool_calls,
            failed = summary.failed_tool_calls,
            "turn finished"
        );
        Ok(summary)
    }

    /// Close the open turn after a transport failure.
    pub fn fail_turn(&mut self, error: impl Into<String>) -> Result<TurnSummary> {
        let turn = self.active.take().ok_or(Error::NoActiveTurn)?;
        let error = error.into();
        tracing::warn!(error = %error, "turn failed");
        self.status = ChatStatus::Error;
        self.last_error = Some(error);
        Ok(self.summarize(turn, false))
    }

    /// Stop the open turn. Applied tool calls are kept.
    pub fn cancel_turn(&mut self) -> Result<TurnSummary> {
        let turn = self.active.take().ok_or(Error::NoActiveTurn)?;
        self.status = ChatStatus::Ready;
        let summary = self.summarize(turn, true);
        tracing::info!(tool_calls = summary.tool_calls, "turn cancelled");
        Ok(summary)
    }

    /// Submit `text` and drive the turn to completion.
    ///
    /// The transport produces into a bounded queue; this session is its only
    /// consumer. Consumption stops at a `finish` event, when the transport
    /// closes the queue, or when `cancel` fires. A transport error leaves the
    /// session in status `error` and is returned.
    pub async fn run_turn(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnSummary> {
        let request = self.begin_turn(text)?;

        let transport = Arc::clone(&self.transport);
        let (tx, mut rx) = mpsc::channel(self.queue_capacity);
        let producer = async move { transport.stream(request, tx).await };
        tokio::pin!(producer);

        let mut producer_done = false;
        let mut queue_closed = false;
        let mut transport_error = None;
        let mut cancelled = false;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                event = rx.recv() => match event {
                    Some(StreamEvent::Finish) => {
                        self.apply_event(StreamEvent::Finish)?;
                        break;
                    }
                    Some(event) => self.apply_event(event)?,
                    None => {
                        queue_closed = true;
                        break;
                    }
                },
                result = &mut producer, if !producer_done => {
                    producer_done = true;
                    if let Err(e) = result {
                        transport_error = Some(transport_message(e));
                    }
                }
            }
        }

        if cancelled {
            return self.cancel_turn();
        }
        // The transport may close the queue before it returns
        if queue_closed && !producer_done {
            if let Err(e) = producer.await {
                transport_error = Some(transport_message(e));
            }
        }
        match transport_error {
            Some(error) => {
                self.fail_turn(error.clone())?;
                Err(Error::Transport(error))
            }
            None => self.finish_turn(),
        }
    }

    /// Assistant message of the open turn, created on first use.
    fn assistant_message(&mut self) -> &mut ChatMessage {
        let index = match self.active.as_ref().and_then(|t| t.assistant) {
            Some(index) => index,
            None => {
                self.messages.push(ChatMessage::assistant());
                let index = self.messages.len() - 1;
                if let Some(turn) = self.active.as_mut() {
                    turn.assistant = Some(index);
                }
                index
            }
        };
        &mut self.messages[index]
    }

    fn summarize(&self, turn: ActiveTurn, cancelled: bool) -> TurnSummary {
        TurnSummary {
            message_id: turn
                .assistant
                .and_then(|i| self.messages.get(i))
                .filter(|m| m.role == Role::Assistant)
                .map(|m| m.id.clone()),
            tool_calls: turn.tool_calls,
            failed_tool_calls: turn.failed_tool_calls,
            cancelled,
            status: self.status,
        }
    }

    /// Mirror the session into the anonymous store while no project is bound.
    fn track_anon_work(&self) {
        if self.project_id.is_some() || self.messages.is_empty() {
            return;
        }
        if let Some(store) = &self.anon_store {
            store.set(self.messages.clone(), self.fs.serialize());
        }
    }
}

fn transport_message(e: Error) -> String {
    match e {
        Error::Transport(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorKind, InvocationState};
    use crate::session::SessionAnonStore;
    use async_trait::async_trait;
    use serde_json::json;

    fn create(id: &str, path: &str, text: &str) -> StreamEvent {
        StreamEvent::ToolCall {
            tool_call_id: id.to_string(),
            tool_name: "str_replace_editor".to_string(),
            args: json!({"command": "create", "path": path, "file_text": text}),
        }
    }

    fn session(events: Vec<StreamEvent>) -> (ChatSession, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(events));
        (ChatSession::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_run_turn_applies_tool_calls_in_order() {
        let (mut session, _) = session(vec![
            StreamEvent::TextDelta { text: "Build".into() },
            StreamEvent::TextDelta { text: "ing".into() },
            create("c1", "/App.jsx", "v1"),
            StreamEvent::ToolCall {
                tool_call_id: "c2".into(),
                tool_name: "str_replace_editor".into(),
                args: json!({
                    "command": "str_replace",
                    "path": "/App.jsx",
                    "old_str": "v1",
                    "new_str": "v2"
                }),
            },
            StreamEvent::Finish,
        ]);

        let summary = session.run_turn("make an app", &CancellationToken::new()).await.unwrap();
        assert_eq!(summary.tool_calls, 2);
        assert_eq!(summary.failed_tool_calls, 0);
        assert_eq!(session.status(), ChatStatus::Ready);
        assert_eq!(session.file_system().read("/App.jsx").unwrap(), "v2");

        let assistant = &session.messages()[1];
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.text(), "Building");
        let ids: Vec<_> = assistant.tool_invocations().map(|i| i.tool_call_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert!(assistant.tool_invocations().all(|i| i.state() == InvocationState::Result));
        assert_eq!(summary.message_id.as_deref(), Some(assistant.id.as_str()));
    }

    #[tokio::test]
    async fn test_failed_tool_call_is_transcript_data() {
        let (mut session, _) = session(vec![
            StreamEvent::ToolCall {
                tool_call_id: "c1".into(),
                tool_name: "file_manager".into(),
                args: json!({"command": "delete", "path": "/missing.js"}),
            },
            StreamEvent::Finish,
        ]);

        let summary = session.run_turn("clean up", &CancellationToken::new()).await.unwrap();
        assert_eq!(summary.failed_tool_calls, 1);
        assert_eq!(session.status(), ChatStatus::Ready);

        let inv = session.messages()[1].tool_invocations().next().unwrap();
        let failure = inv.result().unwrap().failure_info().unwrap();
        assert_eq!(failure.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_outbound_request_carries_latest_snapshot() {
        let (mut session, transport) =
            session(vec![create("c1", "/App.jsx", "hello"), StreamEvent::Finish]);
        let cancel = CancellationToken::new();

        session.run_turn("first", &cancel).await.unwrap();
        // The script replays the same call id, which is ignored the second time
        session.run_turn("second", &cancel).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].files.is_empty());
        assert_eq!(requests[1].files.get("/App.jsx"), Some("hello"));
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[1].system, GENERATION_PROMPT);
    }

    #[test]
    fn test_submission_rejected_while_turn_open() {
        let (mut session, _) = session(vec![]);
        session.begin_turn("one").unwrap();
        assert_eq!(session.status(), ChatStatus::Submitting);
        assert!(matches!(session.begin_turn("two"), Err(Error::TurnInProgress)));

        session.apply_event(StreamEvent::TextDelta { text: "hi".into() }).unwrap();
        assert_eq!(session.status(), ChatStatus::Streaming);
        assert!(matches!(session.begin_turn("three"), Err(Error::TurnInProgress)));
        assert_eq!(session.messages().len(), 2);

        session.finish_turn().unwrap();
        assert!(session.begin_turn("four").is_ok());
    }

    #[test]
    fn test_blank_submission_is_rejected() {
        let (mut session, _) = session(vec![]);
        assert!(matches!(session.begin_turn("   \n"), Err(Error::InvalidInput(_))));
        assert_eq!(session.status(), ChatStatus::Ready);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_event_without_turn_is_rejected() {
        let (mut session, _) = session(vec![]);
        assert!(matches!(session.apply_event(StreamEvent::StepStart), Err(Error::NoActiveTurn)));
    }

    #[test]
    fn test_cancel_keeps_applied_tool_calls() {
        let (mut session, _) = session(vec![]);
        session.begin_turn("go").unwrap();
        session.apply_event(create("c1", "/App.jsx", "kept")).unwrap();

        let summary = session.cancel_turn().unwrap();
        assert!(summary.cancelled);
        assert_eq!(session.status(), ChatStatus::Ready);
        assert_eq!(session.file_system().read("/App.jsx").unwrap(), "kept");
    }

    /// Sends one call, cancels, then sends another that must not be applied.
    struct CancellingTransport {
        cancel: CancellationToken,
    }

    #[async_trait]
    impl GenerationTransport for CancellingTransport {
        async fn stream(
            &self,
            _request: OutboundRequest,
            events: mpsc::Sender<StreamEvent>,
        ) -> Result<()> {
            let _ = events.send(create("c1", "/first.js", "1")).await;
            tokio::task::yield_now().await;
            self.cancel.cancel();
            let _ = events.send(create("c2", "/second.js", "2")).await;
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_turn_cancellation_stops_consumption() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(CancellingTransport { cancel: cancel.clone() });
        let mut session = ChatSession::new(transport);

        let summary = session.run_turn("go", &cancel).await.unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.tool_calls, 1);
        assert!(session.file_system().exists("/first.js"));
        assert!(!session.file_system().exists("/second.js"));
        assert_eq!(session.status(), ChatStatus::Ready);
    }

    #[tokio::test]
    async fn test_transport_error_sets_error_status() {
        let transport = Arc::new(
            ScriptedTransport::new(vec![create("c1", "/App.jsx", "x")])
                .failing_with("connection reset"),
        );
        let mut session = ChatSession::new(transport);

        let err = session.run_turn("go", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(ref m) if m == "connection reset"));
        assert_eq!(session.status(), ChatStatus::Error);
        assert_eq!(session.last_error(), Some("connection reset"));
        // Events sent before the failure were applied
        assert!(session.file_system().exists("/App.jsx"));
        // An errored session accepts the next submission
        assert!(session.begin_turn("retry").is_ok());
    }

    #[tokio::test]
    async fn test_small_queue_still_delivers_everything() {
        let events: Vec<_> = (0..10)
            .map(|i| create(&format!("c{}", i), &format!("/f{}.js", i), "x"))
            .collect();
        let (session, _) = session(events);
        let mut session = session.with_queue_capacity(1);

        let summary = session.run_turn("many", &CancellationToken::new()).await.unwrap();
        assert_eq!(summary.tool_calls, 10);
        assert_eq!(session.file_system().len(), 10);
    }

    #[tokio::test]
    async fn test_anon_work_tracked_without_project() {
        let store = Arc::new(SessionAnonStore::new());
        let (session, _) = session(vec![create("c1", "/App.jsx", "x"), StreamEvent::Finish]);
        let mut session = session.with_anon_store(store.clone());

        session.run_turn("make it", &CancellationToken::new()).await.unwrap();

        let buffer = store.get().unwrap();
        assert_eq!(buffer.messages.len(), 2);
        assert_eq!(buffer.file_system_data.get("/App.jsx"), Some("x"));
    }

    #[tokio::test]
    async fn test_anon_work_not_tracked_with_project() {
        let store = Arc::new(SessionAnonStore::new());
        let (session, transport) =
            session(vec![create("c1", "/App.jsx", "x"), StreamEvent::Finish]);
        let mut session = session
            .with_project_id("uf-abc123")
            .with_anon_store(store.clone());

        session.run_turn("make it", &CancellationToken::new()).await.unwrap();

        assert!(store.get().is_none());
        assert_eq!(transport.requests()[0].project_id.as_deref(), Some("uf-abc123"));
    }

    #[test]
    fn test_resume_from_snapshot() {
        let snapshot = ProjectSnapshot::from_files([("/App.jsx", "saved")]);
        let (session, _) = session(vec![]);
        let session = session
            .with_messages(vec![ChatMessage::user("earlier")])
            .with_snapshot(&snapshot)
            .unwrap();

        assert_eq!(session.snapshot(), snapshot);
        assert_eq!(session.outbound_request().messages.len(), 1);
    }
}
