//! External validation command
//!
//! The user's command text is rendered once into an executable script and run with the
//! candidate workspace as its current directory. Only the exit status and the wall-clock
//! duration matter. Output is discarded, or passed through with the command's stdout
//! sent to our stderr so that stdout stays reserved for the report. A command killed by
//! a signal simply failed.

use crate::error::BisectError;
use crate::fileio::FileIo;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Exit status and duration of one command invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    /// `None` when the shell was terminated by a signal
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub duration: Duration,
}

impl CommandResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A rendered shell command
#[derive(Debug, Clone)]
pub struct ShellCommand {
    command_text: String,
    script_path: PathBuf,
    shell: String,
    show_output: bool,
}

impl ShellCommand {
    /// Write `command_text` to `script_path` as an executable script
    pub fn render(
        io: &FileIo,
        command_text: &str,
        script_path: PathBuf,
        shell: &str,
        show_output: bool,
    ) -> Result<Self, BisectError> {
        let mut script = command_text.to_string();
        if !script.ends_with('\n') {
            script.push('\n');
        }
        io.write_script(&script_path, &script)?;
        debug!(script = %script_path.display(), "Rendered test script");
        Ok(Self {
            command_text: command_text.to_string(),
            script_path,
            shell: shell.to_string(),
            show_output,
        })
    }

    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Run the script in `cwd` and wait for it to exit
    pub fn run(&self, cwd: &Path) -> Result<CommandResult, BisectError> {
        info!(command = %self.command_text, cwd = %cwd.display(), "Running command");
        let mut command = Command::new(&self.shell);
        command.arg(&self.script_path).current_dir(cwd);
        if self.show_output {
            command.stdout(Stdio::from(std::io::stderr()));
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let start = Instant::now();
        let status = command.status().map_err(|e| BisectError::CommandLaunch {
            command: format!("{} {}", self.shell, self.script_path.display()),
            source: e,
        })?;
        let duration = start.elapsed();

        let exit_code = status.code();
        let signal = terminating_signal(&status);
        if let Some(signal) = signal {
            warn!(command = %self.command_text, signal, "Command was killed by a signal");
        }
        debug!(?exit_code, duration_ms = duration.as_millis() as u64, "Command completed");
        Ok(CommandResult {
            exit_code,
            signal,
            duration,
        })
    }
}

#[cfg(unix)]
fn terminating_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn terminating_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
