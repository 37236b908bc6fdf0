//! CLI parse: clap types for treebisect. No behavior; definitions only.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// treebisect - find which file differences between two trees can be carried over
#[derive(Parser, Debug)]
#[command(name = "treebisect")]
#[command(
    about = "Transfer as many file differences as possible from a failing tree onto a passing tree while a command keeps passing"
)]
pub struct Cli {
    /// Directory tree on which the command passes
    pub passing_path: PathBuf,

    /// Directory tree on which the command fails
    pub failing_path: PathBuf,

    /// Shell command run in the candidate tree; exit code 0 means pass
    pub shell_command: String,

    /// Apply only incremental changes between tests instead of rebuilding the workspace
    #[arg(long)]
    pub assume_no_side_effects: bool,

    /// Skip checking that the inputs pass and fail as claimed
    #[arg(long)]
    pub assume_input_states_are_correct: bool,

    /// Swap the two trees and treat a failing command as a pass
    #[arg(long)]
    pub try_fail: bool,

    /// Directory in which to run the command
    #[arg(long)]
    pub work_path: Option<PathBuf>,

    /// Scratch directory for test.sh, bestResults, and the default work directory
    #[arg(long)]
    pub temp_path: Option<PathBuf>,

    /// Maximum number of parallel jobs
    #[arg(short = 'j', long = "jobs")]
    pub jobs: Option<usize>,

    /// File or directory name to leave out of both trees (repeatable)
    #[arg(long = "ignore", value_name = "NAME")]
    pub ignore: Vec<String>,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Final report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,

    /// Disable logging entirely
    #[arg(long)]
    pub quiet: bool,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}
