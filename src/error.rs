//! Error types for the treebisect directory bisection engine.
//!
//! FileState algebra is total and never produces these; only disk I/O, subprocess
//! invocation, safety checks and configuration can fail.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while bisecting two directory trees
#[derive(Debug, Error)]
pub enum BisectError {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk directory {path:?}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("Refusing to modify {path:?}: {reason}")]
    SafetyViolation { path: PathBuf, reason: String },

    #[error("Failed to launch command '{command}': {source}")]
    CommandLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Given passing state at {path:?} does not actually pass")]
    PassingStateFails { path: PathBuf },

    #[error("Given failing state at {path:?} does not actually fail")]
    FailingStatePasses { path: PathBuf },

    #[error("None of the {differences} differences could be accepted")]
    NothingAccepted { differences: usize },

    #[error("Job {job} stopped without reporting: {message}")]
    WorkerLost { job: u64, message: String },

    #[error("Failed to start the job runtime: {0}")]
    Runtime(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BisectError {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BisectError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the given inputs did not behave as claimed
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            BisectError::PassingStateFails { .. } | BisectError::FailingStatePasses { .. }
        )
    }
}

impl From<config::ConfigError> for BisectError {
    fn from(err: config::ConfigError) -> Self {
        BisectError::Config(err.to_string())
    }
}
