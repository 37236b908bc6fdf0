//! treebisect CLI Binary
//!
//! Bisects the file differences between a passing and a failing directory tree.

use anyhow::Context;
use clap::Parser;
use std::process;
use std::time::Instant;
use tracing::{error, info};
use treebisect::cli::{self, Cli};
use treebisect::logging::init_logging;
use treebisect::search::DiffRunner;

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            match e.downcast_ref::<treebisect::error::BisectError>() {
                Some(bisect_error) => eprintln!("{}", cli::map_error(bisect_error)),
                None => eprintln!("Error: {:#}", e),
            }
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let config = cli::load_config(cli, &cwd)?;
    if let Err(e) = init_logging(Some(&config.logging)) {
        eprintln!("Failed to initialize logging: {}", e);
        return Ok(1);
    }
    info!("treebisect starting");

    let start = Instant::now();
    let runner = DiffRunner::new(&config, cli::run_request(cli))?;
    let report = runner.run()?;
    println!("{}", cli::render_report(&report, cli.report)?);

    let code = cli::exit_code_for(&report);
    if code == 0 {
        info!(elapsed_secs = start.elapsed().as_secs_f64(), "Succeeded");
    } else {
        info!(elapsed_secs = start.elapsed().as_secs_f64(), status = ?report.status, "Failed");
    }
    Ok(code)
}
