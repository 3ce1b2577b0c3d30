//! Looking up the experiment currently scheduled for a hutch.

use crate::error::{LoadError, LoadResult};
use crate::resolver::is_identifier;
use std::process::Command;

/// Script that prints the current experiment name for the hutch substituted
/// for `{}`.
pub const DEFAULT_EXPERIMENT_SCRIPT: &str =
    "/reg/g/pcds/engineering_tools/latest-released/scripts/get_curr_exp {}";

/// Run the experiment lookup for `hutch` and return its raw stdout.
///
/// `template` is a command line with `{}` standing for the hutch name. It is
/// split on whitespace and run directly, without a shell. The caller decodes
/// and trims the output. `hutch` must be a single identifier so it can never
/// add arguments to the command.
pub fn get_current_experiment(template: &str, hutch: &str) -> LoadResult<Vec<u8>> {
    if !is_identifier(hutch) {
        return Err(LoadError::Validation(format!(
            "Invalid hutch name '{}'",
            hutch
        )));
    }
    let command_line = template.replace("{}", hutch);
    let mut parts = command_line.split_whitespace();
    let program = parts.next().ok_or_else(|| {
        LoadError::Validation(format!("Empty experiment command template '{}'", template))
    })?;

    tracing::debug!(command = %command_line, "Looking up current experiment");
    let output = Command::new(program).args(parts).output()?;

    if !output.status.success() {
        return Err(LoadError::Command {
            command: command_line,
            status: output.status.to_string(),
        });
    }
    Ok(output.stdout)
}
