//! Search controller and the jobs it dispatches

pub mod controller;
pub mod job;

pub use controller::{DiffRunner, RunRequest};
pub use job::{Job, JobId, JobMessage, JobSummary};
