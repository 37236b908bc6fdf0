//! File I/O service
//!
//! Copy, remove and directory primitives shared by every component that touches disk.
//! Removal always goes through [`FileIo::check_removable`]; there is no way to delete
//! a path near the filesystem root or a protected path.

use crate::error::BisectError;
use crate::tree::path::{self, absolute_path, lexical_normalize, normal_component_count};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Minimum number of named components a path must have before we delete it
pub const MIN_REMOVABLE_DEPTH: usize = 2;

/// Filesystem primitives with path-safety checks
#[derive(Debug, Clone, Default)]
pub struct FileIo {
    protected_paths: Vec<PathBuf>,
}

impl FileIo {
    /// Create a service with no protected paths
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service that refuses to remove the given paths or their ancestors
    pub fn with_protected_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            protected_paths: paths.iter().map(|p| lexical_normalize(p)).collect(),
        }
    }

    pub fn protected_paths(&self) -> &[PathBuf] {
        &self.protected_paths
    }

    /// Verify that `path` may be modified destructively
    pub fn check_removable(&self, path: &Path) -> Result<(), BisectError> {
        if !path.is_absolute() {
            return Err(BisectError::SafetyViolation {
                path: path.to_path_buf(),
                reason: "path is not absolute".to_string(),
            });
        }
        let normalized = lexical_normalize(path);
        if normal_component_count(&normalized) < MIN_REMOVABLE_DEPTH {
            return Err(BisectError::SafetyViolation {
                path: normalized,
                reason: "too close to the root of the filesystem".to_string(),
            });
        }
        for protected in &self.protected_paths {
            if protected.starts_with(&normalized) {
                return Err(BisectError::SafetyViolation {
                    path: normalized,
                    reason: format!("would remove protected path {:?}", protected),
                });
            }
        }
        Ok(())
    }

    /// Ensure `path` is a directory, replacing a regular file that occupies it or any
    /// of its ancestors
    pub fn ensure_dir_exists(&self, path: &Path) -> Result<(), BisectError> {
        if path.is_file() {
            self.check_removable(path)?;
            fs::remove_file(path).map_err(|e| BisectError::io(path, e))?;
        }
        if path.is_dir() {
            return Ok(());
        }
        if let Some(blocker) = path.ancestors().skip(1).find(|ancestor| ancestor.is_file()) {
            self.check_removable(blocker)?;
            fs::remove_file(blocker).map_err(|e| BisectError::io(blocker, e))?;
            trace!(path = %blocker.display(), "Replaced file with directory");
        }
        fs::create_dir_all(path).map_err(|e| BisectError::io(path, e))
    }

    /// Copy the bytes and permissions of `from` to `to`
    pub fn copy_file(&self, from: &Path, to: &Path) -> Result<(), BisectError> {
        if !to.is_file() {
            if let Some(parent) = to.parent() {
                self.ensure_dir_exists(parent)?;
            }
            self.remove_path(to)?;
        }
        fs::copy(from, to).map_err(|e| BisectError::io(from, e))?;
        trace!(from = %from.display(), to = %to.display(), "Copied file");
        Ok(())
    }

    /// Recursively remove a file or directory; absent paths are ignored, including
    /// paths below a regular file
    pub fn remove_path(&self, path: &Path) -> Result<(), BisectError> {
        self.check_removable(path)?;
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(_) if path.ancestors().skip(1).any(Path::is_file) => return Ok(()),
            Err(e) => return Err(BisectError::io(path, e)),
        };
        if metadata.is_dir() {
            fs::remove_dir_all(path).map_err(|e| BisectError::io(path, e))?;
        } else {
            fs::remove_file(path).map_err(|e| BisectError::io(path, e))?;
        }
        trace!(path = %path.display(), "Removed path");
        Ok(())
    }

    /// Write a text file, creating parent directories
    pub fn write_file(&self, path: &Path, text: &str) -> Result<(), BisectError> {
        if let Some(parent) = path.parent() {
            self.ensure_dir_exists(parent)?;
        }
        fs::write(path, text).map_err(|e| BisectError::io(path, e))
    }

    /// Write a text file and mark it executable
    pub fn write_script(&self, path: &Path, text: &str) -> Result<(), BisectError> {
        self.write_file(path, text)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755))
                .map_err(|e| BisectError::io(path, e))?;
        }
        Ok(())
    }

    /// Location of the relative key `relative` under `root`
    pub fn join(&self, root: &Path, relative: &str) -> PathBuf {
        path::join(root, relative)
    }

    /// Resolve a possibly relative path against the current directory
    pub fn absolute(&self, path: &Path) -> Result<PathBuf, BisectError> {
        absolute_path(path)
    }
}
