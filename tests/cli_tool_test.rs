//! Integration tests for `uf tool` and `uf fs` commands.

mod common;

use common::{TestEnv, create_call, parse_json};
use predicates::prelude::*;
use serde_json::json;

#[test]
fn test_tool_apply_create_then_cat() {
    let env = TestEnv::new();
    let snapshot = env.file("app.json");
    let snapshot = snapshot.to_str().unwrap();

    let result = env.json(&[
        "tool",
        "apply",
        "--snapshot",
        snapshot,
        &create_call("/App.jsx", "export default function App() {}"),
    ]);
    assert_eq!(result["invocation"]["state"], "result");
    assert_eq!(result["invocation"]["result"], "File created: /App.jsx");
    assert_eq!(result["status"], "Wrote App.jsx");
    assert_eq!(result["written"], true);

    let cat = env.json(&["fs", "cat", "--snapshot", snapshot, "/App.jsx"]);
    assert_eq!(cat["content"], "export default function App() {}");
}

#[test]
fn test_tool_apply_reads_stdin() {
    let env = TestEnv::new();
    let snapshot = env.file("app.json");

    env.uf()
        .args(["tool", "apply", "--snapshot", snapshot.to_str().unwrap(), "-"])
        .write_stdin(create_call("/components/Button.jsx", "btn"))
        .assert()
        .success()
        .stdout(predicate::str::contains("File created: /components/Button.jsx"));

    let listing = env.json(&["fs", "ls", "--snapshot", snapshot.to_str().unwrap()]);
    assert_eq!(listing["entries"][0]["kind"], "directory");
    assert_eq!(listing["entries"][0]["path"], "/components");
}

#[test]
fn test_tool_apply_dry_run_does_not_write() {
    let env = TestEnv::new();
    let snapshot = env.file("app.json");

    let result = env.json(&[
        "tool",
        "apply",
        "--dry-run",
        "--snapshot",
        snapshot.to_str().unwrap(),
        &create_call("/a.js", "1"),
    ]);
    assert_eq!(result["written"], false);
    assert!(!snapshot.exists());
}

#[test]
fn test_tool_apply_ambiguous_replace_reports_failure() {
    let env = TestEnv::new();
    let snapshot = env.write(
        "app.json",
        r#"{"/App.jsx": {"type": "file", "content": "a a"}}"#,
    );
    let call = json!({
        "toolName": "str_replace_editor",
        "args": {"command": "str_replace", "path": "/App.jsx", "old_str": "a", "new_str": "b"}
    });

    let result = env.json(&[
        "tool",
        "apply",
        "--snapshot",
        snapshot.to_str().unwrap(),
        &call.to_string(),
    ]);
    assert_eq!(result["invocation"]["result"]["error"]["kind"], "ambiguous_match");

    let cat = env.json(&["fs", "cat", "--snapshot", snapshot.to_str().unwrap(), "/App.jsx"]);
    assert_eq!(cat["content"], "a a");
}

#[test]
fn test_tool_apply_rename_and_delete() {
    let env = TestEnv::new();
    let snapshot = env.write(
        "app.json",
        r#"{"/src/a.js": "one", "/src/b.js": "two", "/App.jsx": "app"}"#,
    );
    let snapshot = snapshot.to_str().unwrap();

    let rename = json!({
        "toolName": "file_manager",
        "args": {"command": "rename", "path": "/src", "new_path": "/lib"}
    });
    let result = env.json(&["tool", "apply", "--snapshot", snapshot, &rename.to_string()]);
    assert_eq!(result["status"], "Renamed to lib");

    let delete = json!({
        "toolName": "file_manager",
        "args": {"command": "delete", "path": "/App.jsx"}
    });
    env.json(&["tool", "apply", "--snapshot", snapshot, &delete.to_string()]);

    let listing = env.json(&["fs", "ls", "--snapshot", snapshot, "/lib"]);
    let paths: Vec<&str> = listing["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["/lib/a.js", "/lib/b.js"]);

    env.uf()
        .args(["fs", "cat", "--snapshot", snapshot, "/App.jsx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""));
}

#[test]
fn test_tool_apply_unknown_command_is_embedded() {
    let env = TestEnv::new();
    let snapshot = env.file("app.json");
    let call = json!({
        "toolName": "str_replace_editor",
        "args": {"command": "undo_edit", "path": "/a.js"}
    });

    let result = env.json(&[
        "tool",
        "apply",
        "--snapshot",
        snapshot.to_str().unwrap(),
        &call.to_string(),
    ]);
    assert_eq!(result["invocation"]["result"]["error"]["kind"], "unsupported_command");
}

#[test]
fn test_tool_apply_invalid_json_fails() {
    let env = TestEnv::new();
    let snapshot = env.file("app.json");

    let output = env
        .uf()
        .args(["tool", "apply", "--snapshot", snapshot.to_str().unwrap(), "{not json"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let err = parse_json(&output);
    assert!(err["error"].as_str().unwrap().contains("Invalid invocation"));
}

#[test]
fn test_tool_apply_human_output() {
    let env = TestEnv::new();
    let snapshot = env.file("app.json");

    env.uf()
        .args(["-H", "tool", "apply", "--snapshot", snapshot.to_str().unwrap()])
        .arg(create_call("/App.jsx", "x"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote App.jsx"))
        .stdout(predicate::str::contains("File created: /App.jsx"));
}

#[test]
fn test_tool_manifest_lists_tools() {
    let env = TestEnv::new();
    let manifest = env.json(&["tool", "manifest"]);
    let tools = manifest["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["name"], "str_replace_editor");
    assert_eq!(tools[1]["commands"], json!(["rename", "delete"]));
}

#[test]
fn test_tool_label() {
    let env = TestEnv::new();
    let label = env.json(&["tool", "label", &create_call("/components/Card.jsx", "")]);
    assert_eq!(label["pending"], "Writing Card.jsx...");
    assert_eq!(label["complete"], "Wrote Card.jsx");
}

#[test]
fn test_fs_ls_missing_snapshot_fails() {
    let env = TestEnv::new();
    env.uf()
        .args(["-H", "fs", "ls", "--snapshot", "missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: Not found"));
}

#[test]
fn test_prompt_mentions_tools() {
    let env = TestEnv::new();
    env.uf()
        .args(["-H", "prompt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("str_replace_editor"))
        .stdout(predicate::str::contains("/App.jsx"));
}
