//! Filesystem walker that snapshots a directory tree into a FileState

use crate::error::BisectError;
use crate::state::{Content, FileState};
use crate::tree::path::canonicalize_path;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, instrument};
use walkdir::{DirEntry, WalkDir};

/// Filesystem entry types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A regular file (or a symlink resolving to one)
    File { path: PathBuf },
    /// A directory containing nothing
    EmptyDirectory { path: PathBuf },
}

impl Entry {
    pub fn path(&self) -> &Path {
        match self {
            Entry::File { path } | Entry::EmptyDirectory { path } => path,
        }
    }
}

/// Filesystem walker configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkerConfig {
    /// Whether to descend into symlinked directories
    pub follow_symlinks: bool,
    /// File and directory names to skip entirely (e.g. ".git")
    pub ignore_patterns: Vec<String>,
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Walk the filesystem and collect files and empty directories
    ///
    /// Returns entries sorted by path for determinism.
    pub fn walk(&self) -> Result<Vec<Entry>, BisectError> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(&self.root).follow_links(self.config.follow_symlinks);

        for entry in walker.into_iter().filter_entry(|e| !self.should_ignore(e)) {
            let entry = entry.map_err(|e| BisectError::Walk {
                path: self.root.clone(),
                message: e.to_string(),
            })?;

            // Skip the root directory itself (we only want its contents)
            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path().to_path_buf();
            let file_type = entry.file_type();

            if file_type.is_file() {
                entries.push(Entry::File { path });
            } else if file_type.is_dir() {
                if self.is_leaf_dir(&path)? {
                    entries.push(Entry::EmptyDirectory { path });
                }
            } else if file_type.is_symlink() && path.is_file() {
                entries.push(Entry::File { path });
            }
        }

        entries.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(entries)
    }

    /// Snapshot the tree as a FileState keyed by paths relative to the root
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn snapshot(&self) -> Result<FileState, BisectError> {
        let start = Instant::now();
        let mut state = FileState::new();
        for entry in self.walk()? {
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| BisectError::Walk {
                    path: entry.path().to_path_buf(),
                    message: e.to_string(),
                })?
                .to_string_lossy()
                .replace('\\', "/");
            let content = match entry {
                Entry::File { path } => Content::FileBacked(path),
                Entry::EmptyDirectory { .. } => Content::EmptyDirectory,
            };
            state.add(relative, content);
        }
        debug!(
            entries = state.size(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Snapshot complete"
        );
        Ok(state)
    }

    fn is_ignored_name(&self, name: &std::ffi::OsStr) -> bool {
        let name = name.to_string_lossy();
        self.config
            .ignore_patterns
            .iter()
            .any(|pattern| name == pattern.as_str())
    }

    fn should_ignore(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0 && self.is_ignored_name(entry.file_name())
    }

    /// A directory with nothing left in it once ignored names are skipped
    fn is_leaf_dir(&self, path: &Path) -> Result<bool, BisectError> {
        for child in std::fs::read_dir(path).map_err(|e| BisectError::io(path, e))? {
            let child = child.map_err(|e| BisectError::io(path, e))?;
            if !self.is_ignored_name(&child.file_name()) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Snapshot the directory at `root` (canonicalized first)
pub fn file_state_from_tree(root: &Path) -> Result<FileState, BisectError> {
    file_state_from_tree_with(root, &WalkerConfig::default())
}

/// Snapshot the directory at `root` with the given walker settings
pub fn file_state_from_tree_with(
    root: &Path,
    config: &WalkerConfig,
) -> Result<FileState, BisectError> {
    let root = canonicalize_path(root)?;
    Walker::with_config(root, config.clone()).snapshot()
}
