//! FileState: an immutable mapping from relative path to [`Content`]
//!
//! Every derived operation returns a new FileState; inputs are never mutated.
//! Absence of a key means "not part of this delta", except where an operation
//! documents that it reads absence as [`Content::Missing`].

use crate::error::BisectError;
use crate::fileio::FileIo;
use crate::state::content::Content;
use crate::tree::path::{self, normal_component_count};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

static MISSING: Content = Content::Missing;

/// A set of relative paths and the content each should have
#[derive(Debug, Clone, Default)]
pub struct FileState {
    entries: BTreeMap<String, Content>,
}

impl FileState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the content for `path` (normalized to a relative key)
    pub fn add(&mut self, path: impl AsRef<str>, content: Content) {
        let key = path::normalize_relative(path.as_ref());
        self.entries.insert(key, content);
    }

    pub fn get(&self, path: &str) -> Option<&Content> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Content)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&str, &Content) -> bool,
    {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, v)| keep(k, v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Entries whose content differs from `other`'s at the same path (absent counts as Missing)
    pub fn without_duplicates_from(&self, other: &FileState) -> Self {
        self.filtered(|path, content| !content.equals(other.get(path).unwrap_or(&MISSING)))
    }

    /// Entries that `other` does not hold with equal content (absent counts as different)
    pub fn without_entries_in(&self, other: &FileState) -> Self {
        self.filtered(|path, content| {
            other
                .get(path)
                .map_or(true, |theirs| !content.equals(theirs))
        })
    }

    /// Entries that `other` holds with equal content
    pub fn common_entries_with(&self, other: &FileState) -> Self {
        self.filtered(|path, content| other.get(path).is_some_and(|theirs| content.equals(theirs)))
    }

    /// Same keys as `self`, with values taken from `other` wherever it has them.
    ///
    /// With `list_empty_dirs`, directories implied by `self` but no longer implied by
    /// the result are added as Missing so the emptied directory is removed too.
    pub fn with_conflicts_from(&self, other: &FileState, list_empty_dirs: bool) -> Self {
        let mut result = Self {
            entries: self
                .entries
                .iter()
                .map(|(path, content)| {
                    let value = other.entries.get(path).unwrap_or(content);
                    (path.clone(), value.clone())
                })
                .collect(),
        };
        if list_empty_dirs {
            let new_dirs = result.list_implied_dirs();
            for dir in self.list_implied_dirs() {
                if !new_dirs.contains(&dir) && !result.contains(&dir) {
                    result.entries.insert(dir, Content::Missing);
                }
            }
        }
        result
    }

    /// Directories that are ancestors of any non-Missing entry
    pub fn list_implied_dirs(&self) -> BTreeSet<String> {
        let mut dirs = BTreeSet::new();
        for (key, content) in &self.entries {
            if content.is_missing() {
                continue;
            }
            let mut current = key.as_str();
            while let Some(parent) = path::parent(current) {
                if !dirs.insert(parent.to_string()) {
                    break;
                }
                current = parent;
            }
        }
        dirs
    }

    /// All of `self`, plus Missing for keys of `other` that `self` neither has nor implies
    pub fn expanded_with_empty_entries_for(&self, other: &FileState) -> Self {
        let implied = self.list_implied_dirs();
        let mut result = self.clone();
        for key in other.entries.keys() {
            if !result.entries.contains_key(key) && !implied.contains(key) {
                result.entries.insert(key.clone(), Content::Missing);
            }
        }
        result
    }

    /// `self` overlaid with every entry of `other`.
    ///
    /// An entry of `other` that is a file or Missing drops the files and directories
    /// `self` holds below it. A non-Missing entry drops what `self` holds at its
    /// ancestors, which are directories with content from then on.
    pub fn merged_with(&self, other: &FileState) -> Self {
        let mut result = self.clone();
        for (key, content) in &other.entries {
            if !matches!(content, Content::EmptyDirectory) {
                result
                    .entries
                    .retain(|path, held| {
                        path == key || held.is_missing() || !path::contains(key, path)
                    });
            }
            if !content.is_missing() {
                let mut current = key.as_str();
                while let Some(parent) = path::parent(current) {
                    if result.entries.get(parent).is_some_and(|held| !held.is_missing()) {
                        result.entries.remove(parent);
                    }
                    current = parent;
                }
            }
            result.entries.insert(key.clone(), content.clone());
        }
        result
    }

    /// The changes that turn `self` into `other`: every entry of `other` that `self`
    /// does not hold with equal content, plus Missing for each key of `self` that
    /// `other` neither holds nor implies as a directory.
    ///
    /// A directory implied by `self` counts as absent, so a file or empty directory
    /// that replaces a populated directory is kept as a change.
    pub fn changes_toward(&self, other: &FileState) -> Self {
        let mut result = other.without_duplicates_from(self);
        let implied = other.list_implied_dirs();
        for key in self.entries.keys() {
            if !other.contains(key) && !implied.contains(key) {
                result.entries.insert(key.clone(), Content::Missing);
            }
        }
        result
    }

    /// What `self` holds at each key of `keys`, Missing where it holds nothing
    pub fn values_at(&self, keys: &FileState) -> Self {
        Self {
            entries: keys
                .entries
                .keys()
                .map(|key| (key.clone(), self.get(key).unwrap_or(&MISSING).clone()))
                .collect(),
        }
    }

    pub fn without_empty_entries(&self) -> Self {
        self.filtered(|_, content| !content.is_missing())
    }

    /// The delta that moves a workspace holding exactly `self` to `self.merged_with(change)`.
    ///
    /// `self` must describe the complete believed workspace so that directories still
    /// holding files outside `change` are never pruned.
    pub fn transition_delta(&self, change: &FileState) -> Self {
        let after = self.merged_with(change);
        let new_dirs = after.list_implied_dirs();
        let mut delta = change.clone();
        for dir in self.list_implied_dirs() {
            let kept = new_dirs.contains(&dir)
                || delta.contains(&dir)
                || after.get(&dir).is_some_and(|content| !content.is_missing());
            if !kept {
                delta.entries.insert(dir, Content::Missing);
            }
        }
        delta
    }

    /// What `self` holds for each key of `change`: its entries at and under the key,
    /// its entries at the key's ancestors, or Missing when there are none
    pub fn baseline_for(&self, change: &FileState) -> Self {
        let mut result = FileState::new();
        for key in change.entries.keys() {
            let mut found = false;
            for (path, content) in &self.entries {
                if path::contains(key, path) {
                    result.entries.insert(path.clone(), content.clone());
                    found = true;
                }
            }
            let mut current = key.as_str();
            while let Some(parent) = path::parent(current) {
                if let Some(content) = self
                    .entries
                    .get(parent)
                    .filter(|content| !content.is_missing())
                {
                    result.entries.insert(parent.to_string(), content.clone());
                }
                current = parent;
            }
            if !found {
                result.entries.insert(key.clone(), Content::Missing);
            }
        }
        result
    }

    /// Per-path content equality over the union of keys, absent counting as Missing
    pub fn same_content_as(&self, other: &FileState) -> bool {
        self.entries
            .keys()
            .chain(other.entries.keys())
            .all(|key| {
                self.get(key)
                    .unwrap_or(&MISSING)
                    .equals(other.get(key).unwrap_or(&MISSING))
            })
    }

    pub fn common_dir(&self) -> Option<String> {
        path::common_prefix(self.keys())
    }

    /// Partition entries by their first path segment below the common directory.
    ///
    /// With `group_direct_files_together`, entries directly in the common directory
    /// share one bucket instead of getting one each.
    pub fn group_by_dirs(&self, group_direct_files_together: bool) -> Vec<FileState> {
        if self.size() <= 1 {
            return if self.is_empty() {
                Vec::new()
            } else {
                vec![self.clone()]
            };
        }

        let prefix_len = self.common_dir().map_or(0, |dir| dir.len() + 1);
        let mut groups: BTreeMap<String, FileState> = BTreeMap::new();
        for (key, content) in &self.entries {
            let sub_path = key.get(prefix_len..).unwrap_or("");
            let first_dir = match sub_path.find('/') {
                Some(index) => &sub_path[..index],
                None if group_direct_files_together => "",
                None => sub_path,
            };
            groups
                .entry(first_dir.to_string())
                .or_default()
                .entries
                .insert(key.clone(), content.clone());
        }
        groups.into_values().collect()
    }

    /// Recursively group by directory `depth` levels down
    pub fn split_depth(&self, depth: usize) -> Vec<FileState> {
        if self.size() <= 1 || depth == 0 {
            return vec![self.clone()];
        }
        let group_direct_files_together = depth <= 1;
        let children = self.group_by_dirs(group_direct_files_together);
        if children.len() == 1 && group_direct_files_together {
            return children[0].group_by_dirs(false);
        }
        children
            .iter()
            .flat_map(|child| child.split_depth(depth - 1))
            .collect()
    }

    pub fn split_once(&self) -> Vec<FileState> {
        self.split_depth(1)
    }

    /// Short human-readable description
    pub fn summarize(&self) -> String {
        let num_files = self.size();
        if num_files <= 4 {
            return self.to_string();
        }
        match self.common_dir() {
            Some(dir) => format!("{} files under {}", num_files, dir),
            None => format!("{} files", num_files),
        }
    }

    /// Realize every entry under `root`
    pub fn apply(&self, io: &FileIo, root: &Path) -> Result<(), BisectError> {
        if !root.is_absolute() || normal_component_count(root) < crate::fileio::MIN_REMOVABLE_DEPTH
        {
            return Err(BisectError::SafetyViolation {
                path: root.to_path_buf(),
                reason: "refusing to apply changes this close to the filesystem root".to_string(),
            });
        }
        for (key, content) in &self.entries {
            content.apply(io, &io.join(root, key))?;
        }
        Ok(())
    }
}

impl FromIterator<(String, Content)> for FileState {
    fn from_iter<I: IntoIterator<Item = (String, Content)>>(iter: I) -> Self {
        let mut state = FileState::new();
        for (path, content) in iter {
            state.add(path, content);
        }
        state
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[empty fileState]");
        }
        if self.size() == 1 {
            write!(f, "1 entry: ")?;
        } else {
            writeln!(f, "{} entries:", self.size())?;
        }
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|(path, content)| format!("{} -> {}", path, content))
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}
