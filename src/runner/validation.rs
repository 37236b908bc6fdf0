//! Validation runner
//!
//! Puts a workspace into the state a candidate describes, runs the command, and reports
//! pass or fail with the elapsed time. Two protocols:
//!
//! - full reset (default): wipe the workspace, write the complete baseline, then the
//!   candidate, before every test.
//! - side-effect free: apply only the transition from the believed workspace to the
//!   candidate, and undo it after a failure so the next test starts from the baseline.

use crate::error::BisectError;
use crate::fileio::FileIo;
use crate::runner::command::ShellCommand;
use crate::state::FileState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Verdict of one validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestOutcome {
    pub passed: bool,
    pub duration: Duration,
}

/// Options that change how candidates are tested
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions {
    /// Trust the command not to modify the workspace in ways that matter
    pub assume_no_side_effects: bool,
    /// Count a nonzero exit as a pass and zero as a fail
    pub invert: bool,
}

/// Runs the command against candidate states in one workspace directory
#[derive(Debug, Clone)]
pub struct Validator {
    command: Arc<ShellCommand>,
    io: FileIo,
    work_path: PathBuf,
    options: ValidationOptions,
}

impl Validator {
    pub fn new(
        command: Arc<ShellCommand>,
        io: FileIo,
        work_path: PathBuf,
        options: ValidationOptions,
    ) -> Self {
        Self {
            command,
            io,
            work_path,
            options,
        }
    }

    pub fn work_path(&self) -> &Path {
        &self.work_path
    }

    pub fn options(&self) -> ValidationOptions {
        self.options
    }

    /// Run the command against whatever the workspace holds now
    pub fn run_command(&self) -> Result<TestOutcome, BisectError> {
        self.io.ensure_dir_exists(&self.work_path)?;
        let result = self.command.run(&self.work_path)?;
        let passed = result.succeeded() != self.options.invert;
        info!(
            passed,
            exit_code = ?result.exit_code,
            signal = ?result.signal,
            duration_secs = result.duration.as_secs_f64(),
            "Shell command completed"
        );
        Ok(TestOutcome {
            passed,
            duration: result.duration,
        })
    }

    /// Wipe the workspace and write `state` into it
    pub fn reset_to(&self, state: &FileState) -> Result<(), BisectError> {
        debug!(work_path = %self.work_path.display(), entries = state.size(), "Resetting workspace");
        self.io.remove_path(&self.work_path)?;
        self.io.ensure_dir_exists(&self.work_path)?;
        state.apply(&self.io, &self.work_path)
    }

    /// Remove the workspace directory entirely
    pub fn clear_workspace(&self) -> Result<(), BisectError> {
        self.io.remove_path(&self.work_path)
    }

    /// Test `state` as a complete tree in a freshly wiped workspace
    pub fn test_fresh(&self, state: &FileState) -> Result<TestOutcome, BisectError> {
        self.reset_to(state)?;
        self.run_command()
    }

    /// Test `candidate` applied on top of `baseline`, the complete tree the workspace
    /// is believed to hold.
    ///
    /// In side-effect-free mode the workspace must already hold `baseline`, and does
    /// again when this returns a failure.
    pub fn test_candidate(
        &self,
        baseline: &FileState,
        candidate: &FileState,
    ) -> Result<TestOutcome, BisectError> {
        let delta = baseline.transition_delta(candidate);
        if self.options.assume_no_side_effects {
            debug!(entries = delta.size(), "Applying incremental delta");
            self.io.ensure_dir_exists(&self.work_path)?;
            delta.apply(&self.io, &self.work_path)?;
        } else {
            self.reset_to(baseline)?;
            delta.apply(&self.io, &self.work_path)?;
        }

        let outcome = self.run_command()?;

        if !outcome.passed && self.options.assume_no_side_effects {
            let after = baseline.merged_with(candidate);
            let undo = after.transition_delta(&baseline.baseline_for(candidate));
            debug!(entries = undo.size(), "Reverting rejected delta");
            undo.apply(&self.io, &self.work_path)?;
        }
        Ok(outcome)
    }
}
