//! Integration tests for the treebisect binary: exit codes, report, and log file

use crate::integration::{with_env, write_tree};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use treebisect::report::{RunReport, RunStatus};

/// Run the binary from `temp/cwd` with an isolated config home and `sh` as the shell.
///
/// Holds the environment lock so `TREEBISECT_*` overrides set by other tests never
/// leak into the child.
fn treebisect(temp: &TempDir, args: &[&str]) -> Output {
    treebisect_with_env(temp, &[], args)
}

fn treebisect_with_env(temp: &TempDir, vars: &[(&str, &str)], args: &[&str]) -> Output {
    let cwd = temp.path().join("cwd");
    fs::create_dir_all(&cwd).unwrap();
    fs::write(
        cwd.join("treebisect.toml"),
        "shell = \"sh\"\nshow_command_output = false\nmax_jobs = 2\n",
    )
    .unwrap();

    with_env(temp, vars, || {
        Command::new(env!("CARGO_BIN_EXE_treebisect"))
            .current_dir(&cwd)
            .env_remove("TREEBISECT_LOG")
            .args(args)
            .output()
            .unwrap()
    })
}

fn inputs(temp: &TempDir) -> (String, String, String) {
    let passing = temp.path().join("passing");
    let failing = temp.path().join("failing");
    write_tree(&passing, &[("a.txt", "1"), ("b.txt", "1"), ("lib/c.txt", "1")]);
    write_tree(&failing, &[("a.txt", "2"), ("b.txt", "2"), ("lib/c.txt", "2")]);
    let scratch = temp.path().join("scratch");
    (display(&passing), display(&failing), display(&scratch))
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_successful_run_prints_json_report() {
    let temp = TempDir::new().unwrap();
    let (passing, failing, scratch) = inputs(&temp);

    let output = treebisect(
        &temp,
        &[
            "--quiet",
            "--report",
            "json",
            "--temp-path",
            &scratch,
            &passing,
            &failing,
            "grep -q 1 a.txt",
        ],
    );
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: RunReport = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.original_differences, 3);
    assert_eq!(report.accepted_differences, 2);
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].path, "a.txt");
}

#[test]
fn test_command_output_stays_off_stdout() {
    let temp = TempDir::new().unwrap();
    let (passing, failing, scratch) = inputs(&temp);

    let output = treebisect_with_env(
        &temp,
        &[("TREEBISECT_SHOW_COMMAND_OUTPUT", "true")],
        &[
            "--quiet",
            "--report",
            "json",
            "--temp-path",
            &scratch,
            &passing,
            &failing,
            "echo chatter-on-stdout; grep -q 1 a.txt",
        ],
    );
    assert_eq!(output.status.code(), Some(0));

    let report: RunReport = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report.status, RunStatus::Success);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("chatter-on-stdout"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("chatter-on-stdout"));
}

#[test]
fn test_precondition_failure_exits_one() {
    let temp = TempDir::new().unwrap();
    let (passing, failing, scratch) = inputs(&temp);

    let output = treebisect(
        &temp,
        &["--quiet", "--temp-path", &scratch, &passing, &failing, "true"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("must behave as claimed"));
}

#[test]
fn test_usage_error_exits_two() {
    let temp = TempDir::new().unwrap();
    let output = treebisect(&temp, &["only-one-path"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_log_file_receives_progress() {
    let temp = TempDir::new().unwrap();
    let (passing, failing, scratch) = inputs(&temp);
    let log_file = temp.path().join("logs").join("run.log");

    let output = treebisect(
        &temp,
        &[
            "--log-file",
            &display(&log_file),
            "--temp-path",
            &scratch,
            &passing,
            &failing,
            "grep -q 1 a.txt",
        ],
    );
    assert_eq!(output.status.code(), Some(0));

    let log = fs::read_to_string(&log_file).unwrap();
    assert!(log.contains("Received successful response"));
    assert!(log.contains("Double-checking results"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Bisection Report"));
}
