//! Search job
//!
//! A job owns one Hyperbox of candidate leaves and an isolated workspace. It first
//! scans every slice of the box, then (for boxes of two or more dimensions) tests the
//! intersection of the fastest-failing slices. Every passing slice is reported to the
//! controller as soon as it is found; when the job ends it hands back the leaves it
//! could not dispose of.
//!
//! Cancellation is advisory and checked between tests, never during one.

use crate::error::BisectError;
use crate::hyperbox::Hyperbox;
use crate::runner::{TestOutcome, Validator};
use crate::state::FileState;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, instrument, warn};

/// Numeric identifier of a job; also names its workspace directory
pub type JobId = u64;

/// Messages sent from jobs to the controller
#[derive(Debug)]
pub enum JobMessage {
    /// A slice passed against the job's current baseline
    Accepted { job: JobId, state: FileState },
    /// The job stopped; `remaining` holds every leaf it did not accept
    Finished {
        job: JobId,
        remaining: Vec<FileState>,
        outcome: Result<JobSummary, BisectError>,
    },
}

/// Counters reported when a job finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub tests_run: usize,
    pub slices_accepted: usize,
    pub cancelled: bool,
}

pub struct Job {
    id: JobId,
    validator: Validator,
    workspace: FileState,
    hyperbox: Hyperbox,
    set_aside: Vec<FileState>,
    results: UnboundedSender<JobMessage>,
    cancel: oneshot::Receiver<()>,
}

impl Job {
    /// `workspace` is the complete baseline the job starts from
    pub fn new(
        id: JobId,
        validator: Validator,
        workspace: FileState,
        hyperbox: Hyperbox,
        results: UnboundedSender<JobMessage>,
        cancel: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            id,
            validator,
            workspace,
            hyperbox,
            set_aside: Vec::new(),
            results,
            cancel,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Run to completion, remove the workspace, and report `Finished`
    pub fn run_and_report(mut self) {
        let mut outcome = self.run();
        let work_path = self.validator.work_path().to_path_buf();
        if let Err(e) = self.validator.clear_workspace() {
            warn!(job = self.id, work_path = %work_path.display(), error = %e, "Failed to remove job workspace");
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }

        let Job {
            id,
            hyperbox,
            mut set_aside,
            results,
            ..
        } = self;
        let mut remaining = hyperbox.into_children();
        remaining.append(&mut set_aside);
        info!(job = id, remaining = remaining.len(), "Job reported completion");
        if results
            .send(JobMessage::Finished {
                job: id,
                remaining,
                outcome,
            })
            .is_err()
        {
            debug!(job = id, "Controller stopped listening before job finished");
        }
    }

    #[instrument(skip(self), fields(job = self.id, dimensions = ?self.hyperbox.dimensions()))]
    fn run(&mut self) -> Result<JobSummary, BisectError> {
        let mut summary = JobSummary::default();
        if self.validator.options().assume_no_side_effects {
            self.validator.reset_to(&self.workspace)?;
        }

        if !self.scan_slices(&mut summary)? {
            summary.cancelled = true;
            return Ok(summary);
        }
        if self.hyperbox.num_dimensions() >= 2 && !self.search_corners(&mut summary)? {
            summary.cancelled = true;
        }
        Ok(summary)
    }

    /// Test every slice of every axis, last index first. Returns false if cancelled.
    fn scan_slices(&mut self, summary: &mut JobSummary) -> Result<bool, BisectError> {
        for dimension in 0..self.hyperbox.num_dimensions() {
            let mut index = self.hyperbox.size(dimension);
            while index > 0 {
                index -= 1;
                if self.is_cancelled() {
                    return Ok(false);
                }
                if dimension > 0 && self.hyperbox.size(dimension) == 1 {
                    // The last row must still fail; keep it eligible for timing analysis
                    self.hyperbox
                        .set_slice_duration(dimension, index, Some(Duration::ZERO));
                    continue;
                }

                let slice = self.hyperbox.slice(dimension, index);
                if slice.is_empty() {
                    debug!(dimension, index, "Skipping empty slice");
                    self.hyperbox.set_slice_duration(dimension, index, None);
                    continue;
                }
                info!(
                    job = self.id,
                    dimension,
                    index,
                    dimensions = ?self.hyperbox.dimensions(),
                    "Testing slice"
                );
                let outcome = self.test(&slice, summary)?;
                if outcome.passed {
                    info!(job = self.id, slice = %slice.summarize(), "Accepted slice");
                    self.hyperbox.remove_slice(dimension, index);
                } else {
                    info!(job = self.id, slice = %slice.summarize(), "Rejected slice");
                    self.hyperbox
                        .set_slice_duration(dimension, index, Some(outcome.duration));
                }
            }
        }
        Ok(true)
    }

    /// Repeatedly clear the block where the fastest-failing slices meet and retest the
    /// slices through it. Returns false if cancelled.
    fn search_corners(&mut self, summary: &mut JobSummary) -> Result<bool, BisectError> {
        debug!(job = self.id, "Starting timing analysis");
        let limit = self.hyperbox.num_dimensions();
        let mut successes = 0usize;
        let mut failures = 0usize;

        loop {
            if self.is_cancelled() {
                return Ok(false);
            }
            if failures > successes + limit {
                debug!(job = self.id, failures, successes, "Too many failures in a row");
                break;
            }
            let Some(coordinates) = self.hyperbox.fastest_indices() else {
                debug!(job = self.id, "An axis has no failing slices left");
                break;
            };

            let block = self.hyperbox.files(&coordinates).clone();
            if block.is_empty() {
                debug!(job = self.id, ?coordinates, "Returned to a previously cleared block");
                break;
            }
            info!(job = self.id, ?coordinates, block = %block.summarize(), "Clearing block");
            self.hyperbox.clear_files(&coordinates);
            self.set_aside.push(block);

            for (dimension, &index) in coordinates.iter().enumerate() {
                let slice = self.hyperbox.slice(dimension, index);
                if slice.is_empty() {
                    self.hyperbox.set_slice_duration(dimension, index, None);
                    continue;
                }
                let outcome = self.test(&slice, summary)?;
                if outcome.passed {
                    info!(job = self.id, slice = %slice.summarize(), "Accepted shortened slice");
                    successes += 1;
                    self.hyperbox.remove_slice(dimension, index);
                } else {
                    info!(job = self.id, slice = %slice.summarize(), "Rejected shortened slice");
                    failures += 1;
                    self.hyperbox
                        .set_slice_duration(dimension, index, Some(outcome.duration));
                }
            }
        }
        Ok(true)
    }

    /// Test `slice` on top of the job's workspace and report it if it passes
    fn test(
        &mut self,
        slice: &FileState,
        summary: &mut JobSummary,
    ) -> Result<TestOutcome, BisectError> {
        let outcome = self.validator.test_candidate(&self.workspace, slice)?;
        summary.tests_run += 1;
        if outcome.passed {
            summary.slices_accepted += 1;
            self.workspace = self.workspace.merged_with(slice).without_empty_entries();
            if self
                .results
                .send(JobMessage::Accepted {
                    job: self.id,
                    state: slice.clone(),
                })
                .is_err()
            {
                debug!(job = self.id, "Controller stopped listening");
            }
        }
        Ok(outcome)
    }

    fn is_cancelled(&mut self) -> bool {
        match self.cancel.try_recv() {
            Ok(()) | Err(TryRecvError::Closed) => {
                info!(job = self.id, "Job cancelled");
                true
            }
            Err(TryRecvError::Empty) => false,
        }
    }
}
