//! Merge rules: defaults that every later source overrides.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    let temp_path = crate::config::default_temp_path();
    Config::builder()
        .set_default("assume_no_side_effects", false)?
        .set_default("assume_input_states_are_correct", false)?
        .set_default("try_fail", false)?
        .set_default("temp_path", temp_path.to_string_lossy().to_string())?
        .set_default("max_jobs", crate::config::default_max_jobs() as i64)?
        .set_default("shell", "bash")?
        .set_default("show_command_output", true)?
        .set_default("follow_symlinks", false)
}
