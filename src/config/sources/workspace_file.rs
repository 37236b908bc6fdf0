//! Workspace config file source: ./treebisect.toml in the invoking directory

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::{Path, PathBuf};

pub const WORKSPACE_CONFIG_FILE: &str = "treebisect.toml";

pub fn workspace_config_path(cwd: &Path) -> PathBuf {
    cwd.join(WORKSPACE_CONFIG_FILE)
}

/// Add the workspace config file to builder, overriding the global file.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    cwd: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = workspace_config_path(cwd);
    if path.exists() {
        return Ok(builder.add_source(File::from(path).required(false)));
    }
    Ok(builder)
}
