//! Serialized view of a project tree.
//!
//! A [`ProjectSnapshot`] is the only form in which project files cross the
//! system boundary: it is attached to every outbound generation request,
//! stored with projects, and kept in the anonymous work buffer.
//!
//! Wire shape:
//!
//! ```json
//! { "/App.jsx": { "type": "file", "content": "export default ..." } }
//! ```
//!
//! For leniency, a bare string value is read as file content and
//! `{"type": "directory"}` entries are accepted (directories are implicit).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SnapshotEntry {
    File { content: String },
    Directory {},
}

impl SnapshotEntry {
    /// File content, or `None` for directory markers.
    pub fn content(&self) -> Option<&str> {
        match self {
            SnapshotEntry::File { content } => Some(content),
            SnapshotEntry::Directory {} => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Entry(SnapshotEntry),
    Plain(String),
}

impl From<RawEntry> for SnapshotEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Entry(entry) => entry,
            RawEntry::Plain(content) => SnapshotEntry::File { content },
        }
    }
}

/// Ordered mapping of absolute path to entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProjectSnapshot(BTreeMap<String, SnapshotEntry>);

impl ProjectSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from `(path, content)` pairs.
    pub fn from_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        Self(
            files
                .into_iter()
                .map(|(path, content)| {
                    (
                        path.into(),
                        SnapshotEntry::File {
                            content: content.into(),
                        },
                    )
                })
                .collect(),
        )
    }

    /// Content of the file at `path`, if the snapshot holds one.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).and_then(SnapshotEntry::content)
    }

    /// Iterate file entries in path order, skipping directory markers.
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(path, entry)| entry.content().map(|c| (path.as_str(), c)))
    }

    /// Iterate every entry, including directory markers.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &SnapshotEntry)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for ProjectSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawEntry>::deserialize(deserializer)?;
        Ok(Self(raw.into_iter().map(|(k, v)| (k, v.into())).collect()))
    }
}
