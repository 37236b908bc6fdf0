//! Validation runner: applies candidate states and runs the external command

pub mod command;
pub mod validation;

pub use command::{CommandResult, ShellCommand};
pub use validation::{TestOutcome, ValidationOptions, Validator};
