//! Common test utilities for uiforge integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/uiforge/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with isolated data and config storage.
///
/// - `work_dir`: Holds snapshot and event files
/// - `data_dir`: Holds projects and the data-directory config (via `UF_DATA_DIR`)
/// - `config_home`: Stands in for `~/.config` so no system config.kdl is read
///
/// The `uf()` method sets these per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub data_dir: TempDir,
    pub config_home: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
            config_home: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the uf binary with isolated directories.
    pub fn uf(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_uf"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("UF_DATA_DIR", self.data_dir.path());
        cmd.env("XDG_CONFIG_HOME", self.config_home.path());
        cmd.env_remove("UF_OUTPUT_FORMAT");
        cmd.env_remove("UF_LOG");
        cmd.env_remove("UF_QUEUE_CAPACITY");
        cmd
    }

    /// Path of a file in the work directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.work_dir.path().join(name)
    }

    /// Write a file in the work directory and return its path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.file(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Run `uf` with `args`, assert success and parse stdout as JSON.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.uf().args(args).assert().success().get_output().stdout.clone();
        parse_json(&output)
    }

    /// Create a project and return its ID.
    pub fn create_project(&self, name: &str) -> String {
        let json = self.json(&["project", "create", name]);
        json["id"].as_str().expect("No id in output").to_string()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse JSON output from a command.
pub fn parse_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("Failed to parse JSON output")
}

/// A `str_replace_editor create` invocation.
pub fn create_call(path: &str, text: &str) -> String {
    serde_json::json!({
        "toolName": "str_replace_editor",
        "args": {"command": "create", "path": path, "file_text": text}
    })
    .to_string()
}
