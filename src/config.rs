//! Configuration System
//!
//! Layered configuration for a bisection run: built-in defaults, then the global
//! config file, then `./treebisect.toml`, then `TREEBISECT_*` environment variables.
//! Command-line flags are applied on top by the CLI. Tests included.

use crate::error::BisectError;
use crate::logging::LoggingConfig;
use crate::tree::path::{absolute_path, lexical_normalize};
use crate::tree::WalkerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use sources::global_file::global_config_path;
pub use sources::workspace_file::{workspace_config_path, WORKSPACE_CONFIG_FILE};

/// Prefix for environment overrides, e.g. `TREEBISECT_MAX_JOBS=4`
pub const ENV_PREFIX: &str = "TREEBISECT";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BisectConfig {
    /// Apply only incremental deltas between tests instead of rebuilding the workspace
    #[serde(default)]
    pub assume_no_side_effects: bool,

    /// Skip checking that the passing tree passes and the failing tree fails
    #[serde(default)]
    pub assume_input_states_are_correct: bool,

    /// Swap the inputs and invert the command's verdict
    #[serde(default)]
    pub try_fail: bool,

    /// Directory the command runs in (defaults to `<temp_path>/work`)
    #[serde(default)]
    pub work_path: Option<PathBuf>,

    /// Scratch root holding test.sh, bestResults, and the default work directory
    #[serde(default = "default_temp_path")]
    pub temp_path: PathBuf,

    /// Maximum number of jobs testing candidates at once
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,

    /// Shell used to run the rendered command script
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Pass the command's stdout/stderr through
    #[serde(default = "default_true")]
    pub show_command_output: bool,

    /// Paths that must never be deleted, in addition to the input trees
    #[serde(default)]
    pub protected_paths: Vec<PathBuf>,

    /// File and directory names left out of every snapshot, e.g. ".git"
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Descend into symlinked directories when snapshotting the trees
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

pub(crate) fn default_temp_path() -> PathBuf {
    std::env::temp_dir().join("treebisect")
}

pub(crate) fn default_max_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BisectConfig {
    fn default() -> Self {
        Self {
            assume_no_side_effects: false,
            assume_input_states_are_correct: false,
            try_fail: false,
            work_path: None,
            temp_path: default_temp_path(),
            max_jobs: default_max_jobs(),
            shell: default_shell(),
            show_command_output: true,
            protected_paths: Vec::new(),
            ignore: Vec::new(),
            follow_symlinks: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl BisectConfig {
    /// Check settings that do not depend on the input trees
    pub fn validate(&self) -> Result<(), BisectError> {
        if self.max_jobs == 0 {
            return Err(BisectError::Config("max_jobs must be at least 1".to_string()));
        }
        if self.shell.trim().is_empty() {
            return Err(BisectError::Config("shell cannot be empty".to_string()));
        }
        if self.temp_path.as_os_str().is_empty() {
            return Err(BisectError::Config("temp_path cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Check that the work directory cannot clobber either input tree
    pub fn validate_against_inputs(
        &self,
        passing_path: &Path,
        failing_path: &Path,
    ) -> Result<(), BisectError> {
        self.validate()?;
        let work_path = lexical_normalize(&absolute_path(&self.resolved_work_path())?);
        for input in [passing_path, failing_path] {
            let input = lexical_normalize(&absolute_path(input)?);
            if work_path.starts_with(&input) {
                return Err(BisectError::Config(format!(
                    "work path {} must not be inside input tree {}",
                    work_path.display(),
                    input.display()
                )));
            }
        }
        Ok(())
    }

    /// How the input trees and the best-results directory are walked
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            ignore_patterns: self.ignore.clone(),
        }
    }

    /// Work directory after applying the default
    pub fn resolved_work_path(&self) -> PathBuf {
        self.work_path
            .clone()
            .unwrap_or_else(|| self.temp_path.join("work"))
    }
}

/// Loads BisectConfig from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults -> global file -> `<cwd>/treebisect.toml` -> environment
    pub fn load(cwd: &Path) -> Result<BisectConfig, BisectError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, cwd)?;
        let config: BisectConfig = builder
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults -> explicit file -> environment
    pub fn load_from_file(path: &Path) -> Result<BisectConfig, BisectError> {
        if !path.exists() {
            return Err(BisectError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config: BisectConfig = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path.to_path_buf()))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
