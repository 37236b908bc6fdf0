//! CLI domain: parse, config overlay, and output only.
//! The search itself lives in the library; this layer only wires flags to it.

mod output;
mod parse;

pub use output::{exit_code_for, map_error, render_report};
pub use parse::{Cli, ReportFormat};

use crate::config::{BisectConfig, ConfigLoader};
use crate::error::BisectError;
use crate::logging::LoggingConfig;
use crate::search::RunRequest;
use std::path::Path;

/// Load layered config (or the explicit `--config` file) and overlay CLI flags.
///
/// Flags only turn options on or replace values; they never switch an option off.
pub fn load_config(cli: &Cli, cwd: &Path) -> Result<BisectConfig, BisectError> {
    let mut config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load(cwd)?,
    };

    config.assume_no_side_effects |= cli.assume_no_side_effects;
    config.assume_input_states_are_correct |= cli.assume_input_states_are_correct;
    config.try_fail |= cli.try_fail;
    if let Some(ref work_path) = cli.work_path {
        config.work_path = Some(work_path.clone());
    }
    if let Some(ref temp_path) = cli.temp_path {
        config.temp_path = temp_path.clone();
    }
    if let Some(jobs) = cli.jobs {
        config.max_jobs = jobs;
    }
    config.ignore.extend(cli.ignore.iter().cloned());
    config.logging = overlay_logging(cli, config.logging);
    config.validate()?;
    Ok(config)
}

/// Apply logging flags. Precedence: CLI flags override config file override defaults.
pub fn overlay_logging(cli: &Cli, mut logging: LoggingConfig) -> LoggingConfig {
    if cli.quiet {
        logging.enabled = false;
    }
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        logging.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        logging.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        logging.file = Some(file.clone());
        if cli.log_output.is_none() {
            logging.output = "file".to_string();
        }
    }
    logging
}

pub fn run_request(cli: &Cli) -> RunRequest {
    RunRequest {
        passing_path: cli.passing_path.clone(),
        failing_path: cli.failing_path.clone(),
        command: cli.shell_command.clone(),
    }
}
