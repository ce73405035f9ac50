//! Path normalization for the virtual file system.
//!
//! Rules:
//! - Paths are absolute and must start with `/`
//! - Trailing and repeated slashes are dropped, `.` segments are dropped
//! - Any `..` segment is rejected
//! - Paths are case-sensitive
//! - The bare root `/` names the tree itself, never a file

use super::FsError;

/// The root of the tree.
pub const ROOT: &str = "/";

/// Normalize a file path.
pub fn normalize(path: &str) -> Result<String, FsError> {
    let normalized = normalize_any(path)?;
    if normalized == ROOT {
        return Err(FsError::invalid(path, "the root cannot be a file"));
    }
    Ok(normalized)
}

/// Normalize a directory path; unlike [`normalize`], the root is allowed.
pub fn normalize_dir(path: &str) -> Result<String, FsError> {
    normalize_any(path)
}

fn normalize_any(path: &str) -> Result<String, FsError> {
    if !path.starts_with('/') {
        return Err(FsError::invalid(path, "must start with '/'"));
    }
    if path.contains('\0') {
        return Err(FsError::invalid(path, "contains a NUL byte"));
    }

    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(FsError::invalid(path, "'..' segments are not allowed")),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Ok(ROOT.to_string());
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Prefix that every path under `dir` starts with.
pub(crate) fn dir_prefix(dir: &str) -> String {
    if dir == ROOT {
        ROOT.to_string()
    } else {
        format!("{}/", dir)
    }
}

/// Last segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
