//! Path canonicalization and relative-path utilities
//!
//! FileState keys are POSIX-style relative paths with no leading `/`, no `.`
//! components and no trailing slash. These helpers keep them that way.

use crate::error::BisectError;
use std::path::{Component, Path, PathBuf};

/// Canonicalize an input tree path (resolves symlinks, `..`, `.`)
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, BisectError> {
    dunce::canonicalize(path).map_err(|e| BisectError::io(path, e))
}

/// Make a path absolute without touching the filesystem
pub fn absolute_path(path: &Path) -> Result<PathBuf, BisectError> {
    if path.is_absolute() {
        return Ok(lexical_normalize(path));
    }
    let cwd = std::env::current_dir().map_err(|e| BisectError::io(path, e))?;
    Ok(lexical_normalize(&cwd.join(path)))
}

/// Resolve `.` and `..` components without consulting the filesystem
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Number of normal (named) components in a path
pub fn normal_component_count(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

/// Normalize a relative key: forward slashes, no `.` segments, no leading or trailing `/`
pub fn normalize_relative(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Join a root directory and a relative key
pub fn join(root: &Path, relative: &str) -> PathBuf {
    let mut result = root.to_path_buf();
    for part in relative.split('/').filter(|p| !p.is_empty()) {
        result.push(part);
    }
    lexical_normalize(&result)
}

/// Parent of a relative key, or `None` for a top-level entry
pub fn parent(relative: &str) -> Option<&str> {
    relative.rfind('/').map(|index| &relative[..index])
}

/// Whether `parent` either contains `child` or is `child`
pub fn contains(parent: &str, child: &str) -> bool {
    if parent == child {
        return true;
    }
    child.len() > parent.len()
        && child.starts_with(parent)
        && child.as_bytes()[parent.len()] == b'/'
}

/// Longest common directory prefix of a set of relative keys.
///
/// A single key is its own prefix; keys sharing no leading segment have none.
pub fn common_prefix<'a, I>(paths: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut iter = paths.into_iter();
    let first = iter.next()?;
    let mut prefix: Vec<&str> = first.split('/').collect();
    for path in iter {
        let matching = prefix
            .iter()
            .zip(path.split('/'))
            .take_while(|(a, b)| *a == b)
            .count();
        prefix.truncate(matching);
        if prefix.is_empty() {
            return None;
        }
    }
    Some(prefix.join("/"))
}
