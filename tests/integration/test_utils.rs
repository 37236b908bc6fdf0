//! Shared test utilities for integration tests
//!
//! Tree fixtures, a scratch config per test, and serialized access to the
//! environment variables the config loader reads.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use treebisect::config::BisectConfig;
use treebisect::report::RunReport;
use treebisect::search::{DiffRunner, RunRequest};

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Environment variable state to restore after test
struct EnvState {
    vars: Vec<(String, Option<String>)>,
}

impl EnvState {
    fn capture(names: &[&str]) -> Self {
        Self {
            vars: names
                .iter()
                .map(|name| (name.to_string(), std::env::var(name).ok()))
                .collect(),
        }
    }

    fn restore(self) {
        for (name, value) in self.vars {
            match value {
                Some(orig) => std::env::set_var(&name, orig),
                None => std::env::remove_var(&name),
            }
        }
    }
}

/// Run `f` with XDG_CONFIG_HOME pointed at `test_dir` and the given variables set
///
/// Uses a global mutex so tests that touch the environment never overlap, and
/// restores every variable it changed afterwards.
pub fn with_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let mut names: Vec<&str> = vars.iter().map(|(name, _)| *name).collect();
    names.push("XDG_CONFIG_HOME");
    let env_state = EnvState::capture(&names);

    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().join("xdg"));
    for (name, value) in vars {
        std::env::set_var(name, value);
    }

    let result = f();
    env_state.restore();
    result
}

/// Create `root` holding the given `(relative path, content)` files
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(root).unwrap();
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

/// A config that keeps every scratch file inside `temp`
pub fn scratch_config(temp: &TempDir, name: &str) -> BisectConfig {
    BisectConfig {
        temp_path: temp.path().join(name),
        shell: "sh".to_string(),
        show_command_output: false,
        max_jobs: 1,
        ..BisectConfig::default()
    }
}

pub fn bisect(
    config: &BisectConfig,
    passing: &Path,
    failing: &Path,
    command: &str,
) -> Result<RunReport, treebisect::error::BisectError> {
    DiffRunner::new(
        config,
        RunRequest {
            passing_path: passing.to_path_buf(),
            failing_path: failing.to_path_buf(),
            command: command.to_string(),
        },
    )?
    .run()
}

pub fn unresolved_paths(report: &RunReport) -> Vec<String> {
    report.unresolved.iter().map(|e| e.path.clone()).collect()
}

pub fn read(root: &Path, relative: &str) -> Option<String> {
    fs::read_to_string(root.join(relative)).ok()
}

/// Every regular file under `root` with its content, relative paths sorted
pub fn tree_contents(root: &Path) -> Vec<(PathBuf, String)> {
    let mut files: Vec<(PathBuf, String)> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, fs::read_to_string(entry.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}
