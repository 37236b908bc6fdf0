//! Search controller
//!
//! Owns the global view of the search: the differences still to resolve (`target`),
//! the passing-side values of those differences (`reset`), and the complete tree the
//! workspaces are rebuilt from (`full`). Jobs test slices against a snapshot of
//! `full`; only the controller folds accepted slices back in, and it mirrors every
//! accepted slice into the best-results directory immediately.

use crate::config::BisectConfig;
use crate::error::BisectError;
use crate::fileio::FileIo;
use crate::hyperbox::box_from_list;
use crate::report::{RunReport, RunStatus};
use crate::runner::{ShellCommand, ValidationOptions, Validator};
use crate::search::job::{Job, JobId, JobMessage};
use crate::state::FileState;
use crate::tree::path::canonicalize_path;
use crate::tree::{file_state_from_tree_with, WalkerConfig};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

pub const BEST_RESULTS_DIR: &str = "bestResults";
pub const TEST_SCRIPT_FILE: &str = "test.sh";
pub const MAIN_WORKSPACE: &str = "main";

/// What to bisect: two trees and the command that tells them apart
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub passing_path: PathBuf,
    pub failing_path: PathBuf,
    pub command: String,
}

/// A job that has been dispatched and not yet reported `Finished`
struct ActiveJob {
    cancel: Option<oneshot::Sender<()>>,
}

/// Bookkeeping for the job pool while the search runs
#[derive(Default)]
struct Pool {
    pending: VecDeque<Vec<FileState>>,
    active: HashMap<JobId, ActiveJob>,
    cancelled: HashSet<JobId>,
    late_successes: HashMap<JobId, FileState>,
    next_id: JobId,
    consecutive_failures: usize,
}

pub struct DiffRunner {
    io: FileIo,
    command: Arc<ShellCommand>,
    options: ValidationOptions,
    assume_input_states_are_correct: bool,
    max_jobs: usize,
    walker: WalkerConfig,
    passing_path: PathBuf,
    failing_path: PathBuf,
    work_path: PathBuf,
    best_path: PathBuf,
    passing: FileState,
    failing: FileState,
    full: FileState,
    reset: FileState,
    target: FileState,
    accepted: FileState,
    original_differences: usize,
}

impl DiffRunner {
    /// Snapshot both trees, render the command script, and compute the differences.
    ///
    /// With `try_fail` the trees swap roles and the command's verdict is inverted.
    pub fn new(config: &BisectConfig, request: RunRequest) -> Result<Self, BisectError> {
        config.validate_against_inputs(&request.passing_path, &request.failing_path)?;

        let (passing_path, failing_path) = if config.try_fail {
            (request.failing_path, request.passing_path)
        } else {
            (request.passing_path, request.failing_path)
        };
        let passing_path = canonicalize_path(&passing_path)?;
        let failing_path = canonicalize_path(&failing_path)?;

        let mut protected = config.protected_paths.clone();
        protected.push(passing_path.clone());
        protected.push(failing_path.clone());
        let io = FileIo::with_protected_paths(protected);

        let temp_path = io.absolute(&config.temp_path)?;
        io.ensure_dir_exists(&temp_path)?;
        let work_path = io.absolute(&config.resolved_work_path())?;
        let best_path = temp_path.join(BEST_RESULTS_DIR);
        let command = ShellCommand::render(
            &io,
            &request.command,
            temp_path.join(TEST_SCRIPT_FILE),
            &config.shell,
            config.show_command_output,
        )?;

        let walker = config.walker_config();
        info!(path = %passing_path.display(), "Finding files in passing tree");
        let passing = file_state_from_tree_with(&passing_path, &walker)?;
        info!(path = %failing_path.display(), "Finding files in failing tree");
        let failing = file_state_from_tree_with(&failing_path, &walker)?;

        info!("Identifying duplicates");
        let target = passing.changes_toward(&failing);
        let reset = passing.values_at(&target);
        let original_differences = target.size();
        info!(differences = original_differences, "Processing file differences");

        Ok(Self {
            io,
            command: Arc::new(command),
            options: ValidationOptions {
                assume_no_side_effects: config.assume_no_side_effects,
                invert: config.try_fail,
            },
            assume_input_states_are_correct: config.assume_input_states_are_correct,
            max_jobs: config.max_jobs.max(1),
            walker,
            passing_path,
            failing_path,
            work_path,
            best_path,
            full: passing.clone(),
            passing,
            failing,
            reset,
            target,
            accepted: FileState::new(),
            original_differences,
        })
    }

    pub fn target(&self) -> &FileState {
        &self.target
    }

    pub fn reset(&self) -> &FileState {
        &self.reset
    }

    pub fn best_path(&self) -> &Path {
        &self.best_path
    }

    pub fn original_differences(&self) -> usize {
        self.original_differences
    }

    fn validator(&self, name: &str) -> Validator {
        Validator::new(
            self.command.clone(),
            self.io.clone(),
            self.work_path.join(name),
            self.options,
        )
    }

    /// Check preconditions, search, and double-check the best state
    pub fn run(mut self) -> Result<RunReport, BisectError> {
        let start = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        let main = self.validator(MAIN_WORKSPACE);

        if !self.assume_input_states_are_correct {
            info!("Testing that the given failing state actually fails");
            if main.test_fresh(&self.failing)?.passed {
                return Err(BisectError::FailingStatePasses {
                    path: self.failing_path.clone(),
                });
            }
            info!("Testing that the given passing state actually passes");
            if !main.test_fresh(&self.passing)?.passed {
                return Err(BisectError::PassingStateFails {
                    path: self.passing_path.clone(),
                });
            }
        }

        info!("Saving best state found so far");
        self.io.remove_path(&self.best_path)?;
        self.io.ensure_dir_exists(&self.best_path)?;
        self.passing.apply(&self.io, &self.best_path)?;
        info!(
            best_state = %self.best_path.display(),
            "Inspect the best state while the search runs"
        );

        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(BisectError::Runtime(
                "cannot start a bisection from within an async runtime".to_string(),
            ));
        }
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| BisectError::Runtime(e.to_string()))?;
        runtime.block_on(self.search(start))?;
        drop(runtime);

        info!("Double-checking results");
        let best = file_state_from_tree_with(&self.best_path, &self.walker)?;
        let double_check_passed = main.test_fresh(&best)?.passed;
        let mut hints = Vec::new();
        let status = if !double_check_passed {
            hints = RunReport::double_check_hints(
                self.options.assume_no_side_effects,
                self.assume_input_states_are_correct,
            );
            error!(
                best_state = %self.best_path.display(),
                "Best state did not pass the second time"
            );
            RunStatus::DoubleCheckFailed
        } else if self.accepted.is_empty() {
            let nothing = BisectError::NothingAccepted {
                differences: self.original_differences,
            };
            warn!(error = %nothing, "Search exhausted without accepting any change");
            RunStatus::NothingAccepted
        } else {
            RunStatus::Success
        };

        Ok(RunReport {
            status,
            passing_path: self.passing_path,
            failing_path: self.failing_path,
            original_differences: self.original_differences,
            accepted_differences: self.accepted.size(),
            unresolved_summary: self.target.summarize(),
            unresolved: RunReport::unresolved_entries(&self.target),
            best_state_path: self.best_path,
            started_at,
            elapsed_secs: start.elapsed().as_secs_f64(),
            double_check_passed,
            hints,
        })
    }

    #[instrument(skip_all, fields(differences = self.target.size()))]
    async fn search(&mut self, start: Instant) -> Result<(), BisectError> {
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let mut pool = Pool::default();
        pool.pending.push_back(self.target.split_once());

        loop {
            self.dispatch(&mut pool, &results_tx);
            if pool.active.is_empty() {
                if pool.pending.is_empty() {
                    info!("No changes remain left to test");
                } else {
                    info!(
                        consecutive_failures = pool.consecutive_failures,
                        remaining = self.reset.size(),
                        "Every remaining change has failed in a row"
                    );
                }
                return Ok(());
            }

            info!(
                elapsed_secs = start.elapsed().as_secs(),
                active_jobs = pool.active.len(),
                remaining = self.reset.size(),
                "Waiting for jobs"
            );
            let Some(message) = results_rx.recv().await else {
                return Err(BisectError::WorkerLost {
                    job: 0,
                    message: "result channel closed".to_string(),
                });
            };

            self.handle_message(&mut pool, message)?;
        }
    }

    /// Fold one job message into the pool and the global state.
    ///
    /// A success cancels every other active job; whatever a cancelled job still
    /// accepts is held and requeued, ahead of everything else, once it finishes.
    fn handle_message(&mut self, pool: &mut Pool, message: JobMessage) -> Result<(), BisectError> {
        match message {
            JobMessage::Accepted { job, state } => {
                if state.is_empty() {
                    return Ok(());
                }
                if pool.cancelled.contains(&job) {
                    info!(job, slice = %state.summarize(), "Holding success from cancelled job for retest");
                    let held = pool.late_successes.entry(job).or_default();
                    *held = held.merged_with(&state);
                    return Ok(());
                }
                info!(job, slice = %state.summarize(), "Received successful response");
                self.on_success(&state)?;
                pool.consecutive_failures = 0;
                for (&id, active) in pool.active.iter_mut() {
                    if id == job {
                        continue;
                    }
                    if let Some(cancel) = active.cancel.take() {
                        info!(job = id, cause = job, "Cancelling job");
                        let _ = cancel.send(());
                        pool.cancelled.insert(id);
                    }
                }
            }
            JobMessage::Finished {
                job,
                remaining,
                outcome,
            } => {
                pool.active.remove(&job);
                let summary = match outcome {
                    Ok(summary) => summary,
                    Err(e) => {
                        error!(job, error = %e, "Job failed");
                        cancel_all(pool);
                        return Err(e);
                    }
                };
                debug!(job, ?summary, "Received termination response");
                pool.consecutive_failures += 1;
                pool.cancelled.remove(&job);

                if let Some(held) = pool.late_successes.remove(&job) {
                    let held = held.common_entries_with(&self.target);
                    if !held.is_empty() {
                        pool.pending.push_front(vec![held]);
                    }
                }
                for child in remaining {
                    let child = child.common_entries_with(&self.target);
                    if !child.is_empty() {
                        pool.pending.push_back(child.split_once());
                    }
                }
            }
        }
        Ok(())
    }

    /// Start jobs while capacity, pending boxes, and untried differences remain
    fn dispatch(&self, pool: &mut Pool, results: &mpsc::UnboundedSender<JobMessage>) {
        while pool.active.len() < self.max_jobs
            && pool.consecutive_failures < self.reset.size()
        {
            let Some(leaves) = pool.pending.pop_front() else {
                break;
            };
            let leaves: Vec<FileState> = leaves
                .iter()
                .map(|leaf| leaf.common_entries_with(&self.target))
                .filter(|leaf| !leaf.is_empty())
                .collect();
            if leaves.is_empty() {
                continue;
            }

            pool.next_id += 1;
            let id = pool.next_id;
            let hyperbox = box_from_list(leaves);
            info!(
                job = id,
                children = hyperbox.num_children(),
                dimensions = ?hyperbox.dimensions(),
                "Starting job"
            );
            let (cancel_tx, cancel_rx) = oneshot::channel();
            let job = Job::new(
                id,
                self.validator(&format!("job-{}", id)),
                self.full.clone(),
                hyperbox,
                results.clone(),
                cancel_rx,
            );

            let handle = tokio::task::spawn_blocking(move || job.run_and_report());
            let watchdog = results.clone();
            tokio::spawn(async move {
                if let Err(e) = handle.await {
                    let _ = watchdog.send(JobMessage::Finished {
                        job: id,
                        remaining: Vec::new(),
                        outcome: Err(BisectError::WorkerLost {
                            job: id,
                            message: e.to_string(),
                        }),
                    });
                }
            });
            pool.active.insert(
                id,
                ActiveJob {
                    cancel: Some(cancel_tx),
                },
            );
        }
    }

    /// Fold an accepted slice into the global state and the best-results directory
    fn on_success(&mut self, accepted: &FileState) -> Result<(), BisectError> {
        self.target = self.target.without_entries_in(accepted);
        self.reset = self.target.with_conflicts_from(&self.reset, false);
        let delta = self.full.transition_delta(accepted);
        self.full = self.full.merged_with(accepted).without_empty_entries();
        self.accepted = self.accepted.merged_with(accepted);
        delta.apply(&self.io, &self.best_path)?;
        info!(
            remaining = self.reset.size(),
            accepted = self.accepted.size(),
            "Updated best state"
        );
        debug!(target = %self.target, "Updated target state");
        Ok(())
    }
}

fn cancel_all(pool: &mut Pool) {
    for active in pool.active.values_mut() {
        if let Some(cancel) = active.cancel.take() {
            let _ = cancel.send(());
        }
    }
}
