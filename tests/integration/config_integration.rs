//! Integration tests for Configuration System

use crate::integration::with_env;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use treebisect::cli::{load_config, Cli};
use treebisect::config::{global_config_path, ConfigLoader, WORKSPACE_CONFIG_FILE};

fn write_global_config(test_dir: &TempDir, contents: &str) -> PathBuf {
    let path = test_dir.path().join("xdg").join("treebisect").join("config.toml");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_global_config_path_follows_xdg() {
    let test_dir = TempDir::new().unwrap();
    let path = with_env(&test_dir, &[], global_config_path).unwrap();
    assert_eq!(
        path,
        test_dir.path().join("xdg").join("treebisect").join("config.toml")
    );
}

#[test]
fn test_global_file_is_loaded() {
    let test_dir = TempDir::new().unwrap();
    let cwd = TempDir::new().unwrap();
    write_global_config(&test_dir, "max_jobs = 7\nshell = \"sh\"\n");

    let config = with_env(&test_dir, &[], || ConfigLoader::load(cwd.path())).unwrap();
    assert_eq!(config.max_jobs, 7);
    assert_eq!(config.shell, "sh");
    assert!(!config.try_fail);
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    let cwd = TempDir::new().unwrap();
    write_global_config(&test_dir, "max_jobs = 7\nshell = \"sh\"\n");
    fs::write(
        cwd.path().join(WORKSPACE_CONFIG_FILE),
        "max_jobs = 2\nassume_no_side_effects = true\n",
    )
    .unwrap();

    let config = with_env(&test_dir, &[], || ConfigLoader::load(cwd.path())).unwrap();
    assert_eq!(config.max_jobs, 2);
    assert_eq!(config.shell, "sh");
    assert!(config.assume_no_side_effects);
}

#[test]
fn test_environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    let cwd = TempDir::new().unwrap();
    fs::write(cwd.path().join(WORKSPACE_CONFIG_FILE), "max_jobs = 2\n").unwrap();

    let config = with_env(
        &test_dir,
        &[("TREEBISECT_MAX_JOBS", "5"), ("TREEBISECT_TRY_FAIL", "true")],
        || ConfigLoader::load(cwd.path()),
    )
    .unwrap();
    assert_eq!(config.max_jobs, 5);
    assert!(config.try_fail);
}

#[test]
fn test_nested_logging_from_environment() {
    let test_dir = TempDir::new().unwrap();
    let cwd = TempDir::new().unwrap();

    let config = with_env(&test_dir, &[("TREEBISECT_LOGGING__LEVEL", "trace")], || {
        ConfigLoader::load(cwd.path())
    })
    .unwrap();
    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_invalid_layered_value_is_rejected() {
    let test_dir = TempDir::new().unwrap();
    let cwd = TempDir::new().unwrap();
    fs::write(cwd.path().join(WORKSPACE_CONFIG_FILE), "max_jobs = 0\n").unwrap();

    let result = with_env(&test_dir, &[], || ConfigLoader::load(cwd.path()));
    assert!(result.is_err());
}

#[test]
fn test_cli_flags_override_layered_config() {
    let test_dir = TempDir::new().unwrap();
    let cwd = TempDir::new().unwrap();
    fs::write(
        cwd.path().join(WORKSPACE_CONFIG_FILE),
        "max_jobs = 2\n[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "treebisect",
        "--jobs",
        "6",
        "--try-fail",
        "--verbose",
        "passing",
        "failing",
        "make test",
    ])
    .unwrap();
    let config = with_env(&test_dir, &[], || load_config(&cli, cwd.path())).unwrap();
    assert_eq!(config.max_jobs, 6);
    assert!(config.try_fail);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_explicit_config_file_skips_workspace_file() {
    let test_dir = TempDir::new().unwrap();
    let cwd = TempDir::new().unwrap();
    fs::write(cwd.path().join(WORKSPACE_CONFIG_FILE), "max_jobs = 2\n").unwrap();
    let explicit = test_dir.path().join("explicit.toml");
    fs::write(&explicit, "max_jobs = 9\n").unwrap();

    let config = with_env(&test_dir, &[], || ConfigLoader::load_from_file(&explicit)).unwrap();
    assert_eq!(config.max_jobs, 9);
}
