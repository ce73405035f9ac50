//! Command implementations for uiforge.
//!
//! Each command returns a result type implementing [`Output`], which the
//! binary prints as JSON or, with `-H`, as human-readable text.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatSession, ScriptedTransport, TurnSummary};
use crate::config::ResolvedConfig;
use crate::models::{
    AnonWorkBuffer, NewProject, Project, ProjectSnapshot, ToolInvocation, ToolResult,
};
use crate::session::{
    AnonWorkStore, MigrationOutcome, Router, SessionAnonStore, SessionMigrationManager,
};
use crate::storage::{FileProjectStore, validate_id};
use crate::tools::{self, ProgressLabel, ToolCommand, ToolDef, label_for, status_line};
use crate::vfs::{DirEntry, EntryKind, FsError, VirtualFileSystem};
use crate::{Error, Result};

/// Trait for command output that can be formatted as JSON or human-readable.
pub trait Output {
    fn to_json(&self) -> String;
    fn to_human(&self) -> String;
}

/// Read a command argument, or stdin when the argument is "-".
pub fn read_arg(value: &str) -> Result<String> {
    if value != "-" {
        return Ok(value.to_string());
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

// === Snapshot files ===

/// Read a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<ProjectSnapshot> {
    if !path.exists() {
        return Err(Error::NotFound(format!("Snapshot not found: {}", path.display())));
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(ProjectSnapshot::new());
    }
    serde_json::from_str(&content)
        .map_err(|e| Error::InvalidInput(format!("Invalid snapshot {}: {}", path.display(), e)))
}

/// Read a snapshot file, treating a missing file as an empty project.
pub fn read_snapshot_or_empty(path: &Path) -> Result<ProjectSnapshot> {
    if path.exists() {
        read_snapshot(path)
    } else {
        Ok(ProjectSnapshot::new())
    }
}

/// Write a snapshot file as pretty JSON, creating parent directories.
pub fn write_snapshot(path: &Path, snapshot: &ProjectSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(snapshot)?)?;
    Ok(())
}

fn load_fs(path: &Path, snapshot: &ProjectSnapshot) -> Result<VirtualFileSystem> {
    VirtualFileSystem::from_snapshot(snapshot)
        .map_err(|e| Error::InvalidInput(format!("Invalid snapshot {}: {}", path.display(), e)))
}

fn fs_error(e: FsError) -> Error {
    match e {
        FsError::NotFound(_) => Error::NotFound(e.to_string()),
        other => Error::InvalidInput(other.to_string()),
    }
}

// === Tool Commands ===

/// A tool call as given on the command line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvocationInput {
    #[serde(default)]
    tool_call_id: Option<String>,
    tool_name: String,
    #[serde(default)]
    args: Value,
}

fn parse_invocation(json: &str) -> Result<InvocationInput> {
    serde_json::from_str(json)
        .map_err(|e| Error::InvalidInput(format!("Invalid invocation: {}", e)))
}

#[derive(Serialize)]
pub struct ToolApplied {
    pub invocation: ToolInvocation,
    pub status: String,
    pub files: usize,
    pub written: bool,
}

impl Output for ToolApplied {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        let mut lines = vec![self.status.clone()];
        match self.invocation.result() {
            Some(ToolResult::Failure { error }) => {
                lines.push(format!("Error [{}]: {}", error.kind, error.message));
            }
            Some(ToolResult::Success(Value::String(s))) => lines.push(s.clone()),
            Some(ToolResult::Success(other)) => lines.push(other.to_string()),
            None => {}
        }
        if !self.written {
            lines.push("(snapshot not written)".to_string());
        }
        lines.join("\n")
    }
}

/// Apply one tool invocation to a snapshot file.
///
/// A missing snapshot file starts from an empty project. Failed tool calls
/// are reported in the invocation's result, not as an error.
pub fn tool_apply(
    snapshot_path: &Path,
    invocation_json: &str,
    dry_run: bool,
) -> Result<ToolApplied> {
    let input = parse_invocation(invocation_json)?;
    let snapshot = read_snapshot_or_empty(snapshot_path)?;
    let mut fs = load_fs(snapshot_path, &snapshot)?;

    // A view leaves the tree alone, so the snapshot file is not rewritten
    let mutating =
        ToolCommand::parse(&input.tool_name, &input.args).is_ok_and(|cmd| cmd.is_mutating());
    let call_id = input.tool_call_id.unwrap_or_else(|| "cli".to_string());
    let mut invocation = ToolInvocation::pending(call_id, input.tool_name, input.args);
    tools::run_invocation(&mut fs, &mut invocation)?;

    let written = mutating && !dry_run;
    if written {
        write_snapshot(snapshot_path, &fs.serialize())?;
    }

    Ok(ToolApplied {
        status: status_line(&invocation),
        invocation,
        files: fs.len(),
        written,
    })
}

#[derive(Serialize)]
pub struct ToolManifest {
    pub tools: Vec<ToolDef>,
}

impl Output for ToolManifest {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        self.tools
            .iter()
            .map(|t| {
                format!(
                    "{}: {}\n  commands: {}",
                    t.name,
                    t.description,
                    t.commands.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// List the tools exposed to the agent.
pub fn tool_manifest() -> ToolManifest {
    ToolManifest {
        tools: tools::get_tools(),
    }
}

#[derive(Serialize)]
pub struct ToolLabel {
    pub tool_name: String,
    #[serde(flatten)]
    pub label: ProgressLabel,
}

impl Output for ToolLabel {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        format!("pending:  {}\ncomplete: {}", self.label.pending, self.label.complete)
    }
}

/// Progress labels for an invocation.
pub fn tool_label(invocation_json: &str) -> Result<ToolLabel> {
    let input = parse_invocation(invocation_json)?;
    Ok(ToolLabel {
        label: label_for(&input.tool_name, &input.args),
        tool_name: input.tool_name,
    })
}

// === Fs Commands ===

#[derive(Serialize)]
pub struct FsListing {
    pub path: String,
    pub entries: Vec<DirEntry>,
}

impl Output for FsListing {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return format!("{} is empty", self.path);
        }
        self.entries
            .iter()
            .map(|e| match e.kind {
                EntryKind::Directory => format!("{}/", e.path),
                EntryKind::File => e.path.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// List a directory of a snapshot file.
pub fn fs_ls(snapshot_path: &Path, dir: &str) -> Result<FsListing> {
    let snapshot = read_snapshot(snapshot_path)?;
    let fs = load_fs(snapshot_path, &snapshot)?;
    let entries = fs.list_dir(dir).map_err(fs_error)?;
    Ok(FsListing {
        path: dir.to_string(),
        entries,
    })
}

#[derive(Serialize)]
pub struct FileContent {
    pub path: String,
    pub content: String,
}

impl Output for FileContent {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        self.content.clone()
    }
}

/// Print one file of a snapshot file.
pub fn fs_cat(snapshot_path: &Path, path: &str) -> Result<FileContent> {
    let snapshot = read_snapshot(snapshot_path)?;
    let fs = load_fs(snapshot_path, &snapshot)?;
    let content = fs.read(path).map_err(fs_error)?.to_string();
    Ok(FileContent {
        path: path.to_string(),
        content,
    })
}

// === Session Commands ===

/// Inputs of `uf session replay`.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub events: PathBuf,
    pub snapshot: Option<PathBuf>,
    pub project: Option<String>,
    pub message: String,
    pub anon_out: Option<PathBuf>,
    pub queue_capacity: usize,
}

#[derive(Serialize)]
pub struct ToolCallLine {
    pub tool_call_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ReplayResult {
    #[serde(flatten)]
    pub summary: TurnSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub reply: String,
    pub tool_call_log: Vec<ToolCallLine>,
    pub messages: usize,
    pub files: usize,
    pub snapshot_written: bool,
    pub anon_saved: bool,
}

impl Output for ReplayResult {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if !self.reply.is_empty() {
            lines.push(self.reply.clone());
            lines.push(String::new());
        }
        for call in &self.tool_call_log {
            match &call.error {
                Some(err) => lines.push(format!("  ✗ {} ({})", call.status, err)),
                None => lines.push(format!("  ✓ {}", call.status)),
            }
        }
        lines.push(format!(
            "Turn {}: {} tool call(s), {} failed, {} file(s)",
            if self.summary.cancelled { "cancelled" } else { "finished" },
            self.summary.tool_calls,
            self.summary.failed_tool_calls,
            self.files
        ));
        if let Some(ref id) = self.project_id {
            lines.push(format!("Saved to project {}", id));
        }
        lines.join("\n")
    }
}

/// Run one chat turn from a JSONL event script.
///
/// The starting files come from `--snapshot` if given, otherwise from the
/// project. Afterwards the snapshot file is written back and the project, if
/// any, is saved.
pub async fn session_replay(
    data_dir: &Path,
    opts: ReplayOptions,
    cancel: &CancellationToken,
) -> Result<ReplayResult> {
    let script = fs::read_to_string(&opts.events)
        .map_err(|e| {
            Error::InvalidInput(format!("Cannot read events {}: {}", opts.events.display(), e))
        })?;
    let transport = Arc::new(ScriptedTransport::from_jsonl(&script)?);

    let mut session = ChatSession::new(transport).with_queue_capacity(opts.queue_capacity);
    let mut start = ProjectSnapshot::new();
    let mut store = None;

    if let Some(ref id) = opts.project {
        validate_id(id)?;
        let projects = FileProjectStore::open(data_dir)?;
        let project = projects.get(id)?;
        session = session.with_project_id(id.clone()).with_messages(project.messages);
        start = project.data;
        store = Some(projects);
    }
    if let Some(ref path) = opts.snapshot {
        start = read_snapshot_or_empty(path)?;
    }
    session = session.with_snapshot(&start)?;

    let anon = Arc::new(SessionAnonStore::new());
    if opts.project.is_none() {
        session = session.with_anon_store(anon.clone());
    }

    let summary = session.run_turn(&opts.message, cancel).await?;

    let assistant = summary
        .message_id
        .as_deref()
        .and_then(|id| session.messages().iter().find(|m| m.id == id));
    let reply = assistant.map(|m| m.text()).unwrap_or_default();
    let tool_call_log = assistant
        .map(|m| {
            m.tool_invocations()
                .map(|inv| ToolCallLine {
                    tool_call_id: inv.tool_call_id.clone(),
                    status: status_line(inv),
                    error: inv
                        .result()
                        .and_then(ToolResult::failure_info)
                        .map(|f| format!("{}: {}", f.kind, f.message)),
                })
                .collect()
        })
        .unwrap_or_default();

    let snapshot = session.snapshot();
    let mut snapshot_written = false;
    if let Some(ref path) = opts.snapshot {
        write_snapshot(path, &snapshot)?;
        snapshot_written = true;
    }
    if let (Some(projects), Some(id)) = (&store, &opts.project) {
        projects.save(id, session.messages().to_vec(), snapshot.clone())?;
    }

    let mut anon_saved = false;
    if let Some(ref path) = opts.anon_out {
        if let Some(buffer) = anon.get() {
            fs::write(path, serde_json::to_string_pretty(&buffer)?)?;
            anon_saved = true;
        }
    }

    Ok(ReplayResult {
        summary,
        project_id: opts.project,
        reply,
        tool_call_log,
        messages: session.messages().len(),
        files: snapshot.len(),
        snapshot_written,
        anon_saved,
    })
}

/// Router that remembers where it was sent.
#[derive(Default)]
struct NavigationLog {
    paths: Mutex<Vec<String>>,
}

impl Router for NavigationLog {
    fn navigate(&self, path: &str) {
        self.paths.lock().unwrap_or_else(|e| e.into_inner()).push(path.to_string());
    }
}

#[derive(Serialize)]
pub struct Migrated {
    #[serde(flatten)]
    pub outcome: MigrationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<String>,
}

impl Output for Migrated {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        let action = match self.outcome {
            MigrationOutcome::Migrated { .. } => "Saved anonymous work as",
            MigrationOutcome::Resumed { .. } => "Opened most recent project",
            MigrationOutcome::Created { .. } => "Created empty project",
        };
        format!("{} {}", action, self.outcome.project_id())
    }
}

/// Attach anonymous work to the project store.
///
/// The anonymous work file is removed once it has been saved as a project.
pub async fn session_migrate(data_dir: &Path, anon_path: Option<&Path>) -> Result<Migrated> {
    let store = Arc::new(FileProjectStore::open(data_dir)?);
    let anon = Arc::new(SessionAnonStore::new());
    if let Some(path) = anon_path {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::InvalidInput(format!("Cannot read {}: {}", path.display(), e)))?;
        let buffer: AnonWorkBuffer = serde_json::from_str(&content)
            .map_err(|e| {
                Error::InvalidInput(format!("Invalid anonymous work {}: {}", path.display(), e))
            })?;
        anon.put(buffer);
    }

    let router = Arc::new(NavigationLog::default());
    // Sign-in is owned by the hosting application; `uf` only migrates
    let manager = SessionMigrationManager::migration_only(store, anon, router.clone());
    let outcome = manager.migrate().await?;

    if let (MigrationOutcome::Migrated { .. }, Some(path)) = (&outcome, anon_path) {
        fs::remove_file(path)?;
    }

    let navigate_to = router
        .paths
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .last()
        .cloned();
    Ok(Migrated { outcome, navigate_to })
}

// === Project Commands ===

#[derive(Serialize)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub files: usize,
    pub messages: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&Project> for ProjectRow {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            files: p.data.len(),
            messages: p.messages.len(),
            updated_at: p.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectRow>,
    pub count: usize,
}

impl Output for ProjectList {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects found.".to_string();
        }
        let mut lines = vec![format!("{} project(s):", self.count)];
        for p in &self.projects {
            lines.push(format!(
                "  {} {} ({} files, {} messages, updated {})",
                p.id,
                p.name,
                p.files,
                p.messages,
                p.updated_at.format("%Y-%m-%d %H:%M")
            ));
        }
        lines.join("\n")
    }
}

/// List projects, most recently updated first.
pub fn project_list(data_dir: &Path) -> Result<ProjectList> {
    let store = FileProjectStore::open(data_dir)?;
    let projects: Vec<ProjectRow> = store.list()?.iter().map(ProjectRow::from).collect();
    Ok(ProjectList {
        count: projects.len(),
        projects,
    })
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct ProjectDetail(pub Project);

impl Output for ProjectDetail {
    fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        let p = &self.0;
        let mut lines = vec![
            format!("{} {}", p.id, p.name),
            format!("  Created: {}", p.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
            format!("  Updated: {}", p.updated_at.format("%Y-%m-%d %H:%M:%S UTC")),
            format!("  Messages: {}", p.messages.len()),
            format!("  Files ({}):", p.data.len()),
        ];
        for (path, _) in p.data.files() {
            lines.push(format!("    {}", path));
        }
        lines.join("\n")
    }
}

/// Show one project.
pub fn project_show(data_dir: &Path, id: &str) -> Result<ProjectDetail> {
    validate_id(id)?;
    let store = FileProjectStore::open(data_dir)?;
    Ok(ProjectDetail(store.get(id)?))
}

#[derive(Serialize)]
pub struct ProjectCreated {
    pub id: String,
    pub name: String,
    pub files: usize,
}

impl Output for ProjectCreated {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        format!("Created project {} \"{}\" ({} files)", self.id, self.name, self.files)
    }
}

/// Create a project, optionally seeded from a snapshot file.
pub fn project_create(
    data_dir: &Path,
    name: String,
    snapshot: Option<&Path>,
) -> Result<ProjectCreated> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("Project name must not be empty".to_string()));
    }
    let data = match snapshot {
        Some(path) => {
            let snapshot = read_snapshot(path)?;
            load_fs(path, &snapshot)?.serialize()
        }
        None => ProjectSnapshot::new(),
    };

    let store = FileProjectStore::open(data_dir)?;
    let project = store.create(NewProject {
        name,
        messages: Vec::new(),
        data,
    })?;
    Ok(ProjectCreated {
        files: project.data.len(),
        id: project.id,
        name: project.name,
    })
}

// === Prompt / Config / System ===

#[derive(Serialize)]
pub struct PromptText {
    pub prompt: &'static str,
}

impl Output for PromptText {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        self.prompt.to_string()
    }
}

/// The generation system prompt.
pub fn prompt() -> PromptText {
    PromptText {
        prompt: crate::prompts::GENERATION_PROMPT,
    }
}

#[derive(Serialize)]
pub struct ConfigShow {
    pub data_dir: PathBuf,
    #[serde(flatten)]
    pub config: ResolvedConfig,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        [
            format!("data-dir = {}", self.data_dir.display()),
            format!(
                "output-format = {} ({})",
                self.config.output_format.value, self.config.output_format.source
            ),
            format!(
                "log-level = {} ({})",
                self.config.log_level.value, self.config.log_level.source
            ),
            format!(
                "event-queue-capacity = {} ({})",
                self.config.event_queue_capacity.value, self.config.event_queue_capacity.source
            ),
        ]
        .join("\n")
    }
}

/// Show resolved configuration.
pub fn config_show(data_dir: &Path, config: ResolvedConfig) -> ConfigShow {
    ConfigShow {
        data_dir: data_dir.to_path_buf(),
        config,
    }
}

#[derive(Serialize)]
pub struct SystemInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub built: &'static str,
    pub data_dir: PathBuf,
}

impl Output for SystemInfo {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        format!(
            "Version: {}\nCommit: {}\nBuilt: {}\nData: {}",
            self.version,
            self.commit,
            self.built,
            self.data_dir.display()
        )
    }
}

/// Version, build and data directory information.
pub fn system_info(data_dir: &Path) -> SystemInfo {
    SystemInfo {
        version: crate::cli::package_version(),
        commit: crate::cli::git_commit(),
        built: crate::cli::build_timestamp(),
        data_dir: data_dir.to_path_buf(),
    }
}
