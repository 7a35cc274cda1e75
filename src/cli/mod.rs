//! CLI entrypoint module structure.
use std::io;

use anyhow::Result;
use serde_json::json;

pub mod args;
pub mod exit;
pub mod init;
pub mod profile;

pub use args::{CliCommand, OccArgs, OccCommand, ParsedCommand, RunArgs};
pub use exit::RuntimeExit;
pub use init::{run_init, InitOutcome};
pub use profile::{resolve_config_path, LaunchProfile, DEFAULT_CONFIG_RELATIVE};

/// Build commit baked in at compile time, if the build provided one.
pub const BUILD_COMMIT: Option<&str> = option_env!("OCC_BUILD_COMMIT");

/// Execute CLI command mode and return a user-facing result payload.
pub fn execute_cli_command(command: CliCommand) -> Result<String> {
    match command {
        CliCommand::Init { config_path } => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            let outcome = run_init(&config_path, &mut input, &mut output)?;
            Ok(outcome.message())
        }
        CliCommand::Version => version_payload(),
    }
}

fn version_payload() -> Result<String> {
    let payload = json!({
        "version": env!("CARGO_PKG_VERSION"),
        "build": BUILD_COMMIT.unwrap_or("unknown"),
    });
    Ok(serde_json::to_string_pretty(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_reports_package_version() {
        let payload = execute_cli_command(CliCommand::Version).expect("version should succeed");
        let value: serde_json::Value = serde_json::from_str(&payload).expect("payload is JSON");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
        assert!(value["build"].is_string());
    }
}
