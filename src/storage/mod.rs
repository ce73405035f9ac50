//! Storage layer for uiforge projects.
//!
//! Projects live in `projects.jsonl` inside the data directory
//! (`~/.local/share/uiforge/` unless overridden). The file is append-only:
//! every save appends the full project record, and the last record for an id
//! is the current one.

use crate::models::{
    ChatMessage, CreatedProject, NewProject, Project, ProjectSnapshot, ProjectSummary,
};
use crate::session::ProjectStore;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Prefix of project ids.
pub const ID_PREFIX: &str = "uf";

const PROJECTS_FILE: &str = "projects.jsonl";

/// File-backed project store.
#[derive(Debug, Clone)]
pub struct FileProjectStore {
    /// Root directory holding the JSONL files
    pub root: PathBuf,
}

impl FileProjectStore {
    /// Open the store in `root`, creating the directory and files if needed.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let path = root.join(PROJECTS_FILE);
        if !path.exists() {
            File::create(&path)?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn projects_path(&self) -> PathBuf {
        self.root.join(PROJECTS_FILE)
    }

    fn append(&self, project: &Project) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.projects_path())?;

        let json = serde_json::to_string(project)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    /// Current record of every project, with the line it was last written on.
    fn load(&self) -> Result<HashMap<String, (usize, Project)>> {
        let path = self.projects_path();
        let mut latest = HashMap::new();
        if !path.exists() {
            return Ok(latest);
        }

        let reader = BufReader::new(File::open(&path)?);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Project>(&line) {
                Ok(project) => {
                    latest.insert(project.id.clone(), (line_no, project));
                }
                Err(e) => {
                    tracing::warn!(
                        line = line_no + 1,
                        error = %e,
                        "skipping unreadable project record"
                    );
                }
            }
        }
        Ok(latest)
    }

    /// Create a project with a fresh id.
    pub fn create(&self, request: NewProject) -> Result<Project> {
        let existing = self.load()?;
        let mut id = generate_id(ID_PREFIX, &request.name);
        while existing.contains_key(&id) {
            id = generate_id(ID_PREFIX, &format!("{}{}", request.name, id));
        }

        let project = Project::new(id, request);
        self.append(&project)?;
        tracing::debug!(id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// Get a project by id.
    pub fn get(&self, id: &str) -> Result<Project> {
        self.load()?
            .remove(id)
            .map(|(_, project)| project)
            .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
    }

    /// All projects, most recently updated first.
    pub fn list(&self) -> Result<Vec<Project>> {
        let mut records: Vec<(usize, Project)> = self.load()?.into_values().collect();
        records.sort_by(|(a_line, a), (b_line, b)| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b_line.cmp(a_line))
        });
        Ok(records.into_iter().map(|(_, project)| project).collect())
    }

    /// Replace a project's transcript and files.
    pub fn save(
        &self,
        id: &str,
        messages: Vec<ChatMessage>,
        data: ProjectSnapshot,
    ) -> Result<Project> {
        let mut project = self.get(id)?;
        project.messages = messages;
        project.data = data;
        project.updated_at = Utc::now();
        self.append(&project)?;
        tracing::debug!(id = %project.id, files = project.data.len(), "project saved");
        Ok(project)
    }
}

#[async_trait]
impl ProjectStore for FileProjectStore {
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        Ok(self.list()?.iter().map(Project::summary).collect())
    }

    async fn create_project(&self, project: NewProject) -> Result<CreatedProject> {
        let project = self.create(project)?;
        Ok(CreatedProject { id: project.id })
    }
}

/// Get the data directory.
///
/// An explicit directory wins; otherwise `uiforge` under the platform data
/// directory.
pub fn get_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("uiforge"))
}

/// Generate a unique ID for a project.
///
/// Format: `<prefix>-<6 hex chars>`
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..6])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str) -> Result<()> {
    let Some(suffix) = id.strip_prefix(&format!("{}-", ID_PREFIX)) else {
        return Err(Error::InvalidInput(format!(
            "ID must start with '{}-', got: {}",
            ID_PREFIX, id
        )));
    };
    if suffix.len() != 6 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidInput(format!(
            "ID suffix must be 6 hex characters, got: {}",
            suffix
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    fn named(name: &str) -> NewProject {
        NewProject {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_id_format() {
        let id = generate_id("uf", "test seed");
        assert!(id.starts_with("uf-"));
        assert_eq!(id.len(), 9); // "uf-" + 6 hex chars
        assert!(validate_id(&id).is_ok());
    }

    #[test]
    fn test_generate_id_uniqueness() {
        let id1 = generate_id("uf", "seed");
        let id2 = generate_id("uf", "seed");
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_validate_id_invalid() {
        assert!(validate_id("bn-a1b2c3").is_err());
        assert!(validate_id("uf-a1b2").is_err());
        assert!(validate_id("uf-zzzzzz").is_err());
    }

    #[test]
    fn test_open_creates_files() {
        let env = TestEnv::new();
        let store = env.open_store();
        assert!(store.root().join("projects.jsonl").exists());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_create_and_get() {
        let env = TestEnv::new();
        let store = env.open_store();

        let created = store
            .create(NewProject {
                name: "Landing page".to_string(),
                messages: vec![ChatMessage::user("hero section")],
                data: ProjectSnapshot::from_files([("/App.jsx", "x")]),
            })
            .unwrap();

        let loaded = store.get(&created.id).unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.data.get("/App.jsx"), Some("x"));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let env = TestEnv::new();
        let store = env.open_store();
        assert!(matches!(store.get("uf-000000"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_save_appends_and_last_record_wins() {
        let env = TestEnv::new();
        let store = env.open_store();
        let project = store.create(named("Counter")).unwrap();

        store
            .save(
                &project.id,
                vec![ChatMessage::user("v2")],
                ProjectSnapshot::from_files([("/App.jsx", "2")]),
            )
            .unwrap();

        let loaded = store.get(&project.id).unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.data.get("/App.jsx"), Some("2"));
        assert!(loaded.updated_at >= project.updated_at);

        let content = std::fs::read_to_string(store.root().join("projects.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_most_recent_first() {
        let env = TestEnv::new();
        let store = env.open_store();
        let first = store.create(named("first")).unwrap();
        let second = store.create(named("second")).unwrap();

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

        // Saving moves a project to the front
        store.save(&first.id, Vec::new(), ProjectSnapshot::new()).unwrap();
        let ids: Vec<_> = store.list().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn test_unreadable_lines_are_skipped() {
        let env = TestEnv::new();
        let store = env.open_store();
        store.create(named("ok")).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.root().join("projects.jsonl"))
            .unwrap();
        writeln!(file, "not json").unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_project_store_trait() {
        let env = TestEnv::new();
        let store = env.open_store();

        let created = store.create_project(named("New Design #7")).await.unwrap();
        let listed = store.list_projects().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].name, "New Design #7");
    }

    #[test]
    fn test_get_data_dir_explicit() {
        let dir = Path::new("/tmp/uiforge-test");
        assert_eq!(get_data_dir(Some(dir)).unwrap(), dir);
    }
}
