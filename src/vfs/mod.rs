//! In-memory virtual file system.
//!
//! The project tree is a map from normalized absolute path to text content.
//! Directories are implicit: a directory exists while at least one file path
//! has it as a prefix.
//!
//! Every mutating operation validates completely before it changes anything,
//! so a failed call leaves the tree untouched and a successful one is applied
//! as a single step.

pub mod path;

use crate::models::{ErrorKind, ProjectSnapshot, SnapshotEntry};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// File-system failures, embedded in tool results by the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FsError {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("The text to replace was not found in {0}")]
    TextNotFound(String),

    #[error("Path already exists: {0}")]
    Conflict(String),

    #[error(
        "The text to replace appears {count} times in {path}; include more surrounding context so it matches exactly once"
    )]
    AmbiguousMatch { path: String, count: usize },

    #[error("Line {line} is out of range for {path} ({line_count} lines)")]
    InvalidLine {
        path: String,
        line: i64,
        line_count: usize,
    },
}

impl FsError {
    pub(crate) fn invalid(path: &str, reason: &'static str) -> Self {
        FsError::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }

    /// Stable category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::InvalidPath { .. } => ErrorKind::InvalidPath,
            FsError::NotFound(_) | FsError::TextNotFound(_) => ErrorKind::NotFound,
            FsError::Conflict(_) => ErrorKind::Conflict,
            FsError::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
            FsError::InvalidLine { .. } => ErrorKind::InvalidLine,
        }
    }
}

/// Kind of a directory listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// One direct child of a directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DirEntry {
    pub kind: EntryKind,
    pub path: String,
}

/// The project tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualFileSystem {
    files: BTreeMap<String, String>,
}

impl VirtualFileSystem {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a snapshot.
    pub fn from_snapshot(snapshot: &ProjectSnapshot) -> Result<Self, FsError> {
        let mut fs = Self::new();
        fs.deserialize(snapshot)?;
        Ok(fs)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether a file exists at `path`. Invalid paths never exist.
    pub fn exists(&self, path: &str) -> bool {
        path::normalize(path)
            .map(|p| self.files.contains_key(&p))
            .unwrap_or(false)
    }

    /// Whether `path` names an implicit directory.
    pub fn is_dir(&self, dir: &str) -> bool {
        match path::normalize_dir(dir) {
            Ok(dir) => self.has_children(&dir),
            Err(_) => false,
        }
    }

    /// Read a file.
    pub fn read(&self, path: &str) -> Result<&str, FsError> {
        let path = path::normalize(path)?;
        self.files
            .get(&path)
            .map(String::as_str)
            .ok_or(FsError::NotFound(path))
    }

    /// Create or replace a file.
    ///
    /// Writing a file where a directory exists (e.g. `/src` while `/src/a.js`
    /// is present) is a conflict, as is writing beneath an existing file.
    pub fn write(&mut self, path: &str, content: impl Into<String>) -> Result<(), FsError> {
        let path = path::normalize(path)?;
        if self.has_children(&path) {
            return Err(FsError::Conflict(path));
        }
        if let Some(parent) = self.file_ancestor(&path) {
            return Err(FsError::Conflict(parent));
        }
        self.files.insert(path, content.into());
        Ok(())
    }

    /// Remove a file, or every file under an implicit directory.
    ///
    /// Returns the removed paths.
    pub fn remove(&mut self, path: &str) -> Result<Vec<String>, FsError> {
        let path = path::normalize(path)?;
        if self.files.remove(&path).is_some() {
            return Ok(vec![path]);
        }

        let doomed = self.paths_under(&path);
        if doomed.is_empty() {
            return Err(FsError::NotFound(path));
        }
        for p in &doomed {
            self.files.remove(p);
        }
        Ok(doomed)
    }

    /// Move a file, or every file under an implicit directory, to a new path.
    ///
    /// Fails with `Conflict` if the destination (or any moved file's new
    /// path) already exists. Returns the `(old, new)` pairs that were moved.
    pub fn rename(
        &mut self,
        old_path: &str,
        new_path: &str,
    ) -> Result<Vec<(String, String)>, FsError> {
        let old = path::normalize(old_path)?;
        let new = path::normalize(new_path)?;

        let moves: Vec<(String, String)> = if self.files.contains_key(&old) {
            vec![(old.clone(), new.clone())]
        } else {
            let children = self.paths_under(&old);
            if children.is_empty() {
                return Err(FsError::NotFound(old));
            }
            if new.starts_with(&path::dir_prefix(&old)) {
                return Err(FsError::invalid(
                    new_path,
                    "cannot move a directory inside itself",
                ));
            }
            children
                .into_iter()
                .map(|p| {
                    let moved = format!("{}{}", new, &p[old.len()..]);
                    (p, moved)
                })
                .collect()
        };

        if self.files.contains_key(&new) || self.has_children(&new) {
            return Err(FsError::Conflict(new));
        }
        if let Some(parent) = self.file_ancestor(&new) {
            return Err(FsError::Conflict(parent));
        }
        for (_, target) in &moves {
            if self.files.contains_key(target) {
                return Err(FsError::Conflict(target.clone()));
            }
        }

        for (from, to) in &moves {
            if let Some(content) = self.files.remove(from) {
                self.files.insert(to.clone(), content);
            }
        }
        Ok(moves)
    }

    /// Replace the single occurrence of `old` in a file with `new`.
    ///
    /// Zero occurrences is `TextNotFound`, more than one is `AmbiguousMatch`;
    /// either way the file is unchanged.
    pub fn replace_unique(&mut self, path: &str, old: &str, new: &str) -> Result<(), FsError> {
        let path = path::normalize(path)?;
        let content = self
            .files
            .get(&path)
            .ok_or_else(|| FsError::NotFound(path.clone()))?;

        let count = count_overlapping(content, old);
        match count {
            0 => Err(FsError::TextNotFound(path)),
            1 => {
                let updated = content.replacen(old, new, 1);
                self.files.insert(path, updated);
                Ok(())
            }
            _ => Err(FsError::AmbiguousMatch { path, count }),
        }
    }

    /// Insert `text` after line `line` (1-based); `0` inserts before the
    /// first line. Valid lines are `0..=line_count`.
    ///
    /// Existing line endings are kept as they are; the inserted line ends
    /// with `\r\n` when the file already uses it.
    pub fn insert_lines(&mut self, path: &str, line: usize, text: &str) -> Result<(), FsError> {
        let path = path::normalize(path)?;
        let content = self
            .files
            .get(&path)
            .ok_or_else(|| FsError::NotFound(path.clone()))?;

        let segments: Vec<&str> = content.split_inclusive('\n').collect();
        if line > segments.len() {
            return Err(FsError::InvalidLine {
                line_count: segments.len(),
                line: i64::try_from(line).unwrap_or(i64::MAX),
                path,
            });
        }

        let eol = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let terminated = content.ends_with('\n');
        let mut updated = String::with_capacity(content.len() + text.len() + eol.len() * 2);
        for segment in &segments[..line] {
            updated.push_str(segment);
        }
        // Appending after an unterminated last line
        if line == segments.len() && !content.is_empty() && !terminated {
            updated.push_str(eol);
        }
        updated.push_str(text);
        if line < segments.len() || terminated {
            updated.push_str(eol);
        }
        for segment in &segments[line..] {
            updated.push_str(segment);
        }

        self.files.insert(path, updated);
        Ok(())
    }

    /// All file paths in stable (lexicographic) order.
    pub fn list(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Direct children of a directory, directories first.
    pub fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>, FsError> {
        let dir = path::normalize_dir(dir)?;
        let prefix = path::dir_prefix(&dir);

        let mut entries = BTreeSet::new();
        for p in self.files.keys().filter(|p| p.starts_with(&prefix)) {
            let rest = &p[prefix.len()..];
            match rest.split_once('/') {
                Some((child, _)) => entries.insert(DirEntry {
                    kind: EntryKind::Directory,
                    path: format!("{}{}", prefix, child),
                }),
                None => entries.insert(DirEntry {
                    kind: EntryKind::File,
                    path: p.clone(),
                }),
            };
        }

        if entries.is_empty() && dir != path::ROOT {
            if self.files.contains_key(&dir) {
                return Err(FsError::invalid(&dir, "not a directory"));
            }
            return Err(FsError::NotFound(dir));
        }
        Ok(entries.into_iter().collect())
    }

    /// Serialize the tree.
    pub fn serialize(&self) -> ProjectSnapshot {
        ProjectSnapshot::from_files(self.files.iter().map(|(p, c)| (p.clone(), c.clone())))
    }

    /// Replace the entire tree with the files in `snapshot`.
    ///
    /// Directory markers are skipped. If any path is invalid, two paths
    /// normalize to the same file, or a file sits beneath another file, the
    /// current tree is left as it was.
    pub fn deserialize(&mut self, snapshot: &ProjectSnapshot) -> Result<(), FsError> {
        let mut candidate = Self::new();
        for (raw_path, entry) in snapshot.entries() {
            if let SnapshotEntry::File { content } = entry {
                let normalized = path::normalize(raw_path)?;
                if candidate.files.contains_key(&normalized) {
                    return Err(FsError::Conflict(normalized));
                }
                candidate.files.insert(normalized, content.clone());
            }
        }
        if let Some(ancestor) = candidate.files.keys().find_map(|p| candidate.file_ancestor(p)) {
            return Err(FsError::Conflict(ancestor));
        }

        self.files = candidate.files;
        Ok(())
    }

    fn paths_under(&self, dir: &str) -> Vec<String> {
        let prefix = path::dir_prefix(dir);
        self.files
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn has_children(&self, dir: &str) -> bool {
        let prefix = path::dir_prefix(dir);
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(p, _)| p.starts_with(&prefix))
    }

    /// A strict ancestor of `path` that is itself a file.
    fn file_ancestor(&self, path: &str) -> Option<String> {
        let mut end = path.len();
        while let Some(idx) = path[..end].rfind('/') {
            if idx == 0 {
                break;
            }
            let ancestor = &path[..idx];
            if self.files.contains_key(ancestor) {
                return Some(ancestor.to_string());
            }
            end = idx;
        }
        None
    }
}

/// Occurrences of `needle` in `haystack`, counting overlapping matches.
fn count_overlapping(haystack: &str, needle: &str) -> usize {
    let mut count = 0;
    let mut start = 0;
    while let Some(offset) = haystack[start..].find(needle) {
        count += 1;
        let hit = start + offset;
        // Step one character past the start of this match
        start = hit + haystack[hit..].chars().next().map_or(1, char::len_utf8);
        if start > haystack.len() {
            break;
        }
    }
    count
}
