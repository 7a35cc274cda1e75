//! Entry point for occ.
use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use occ::{
    cli::{
        execute_cli_command, CliCommand, LaunchProfile, OccArgs, ParsedCommand, RunArgs,
        RuntimeExit,
    },
    config::OccConfig,
    lib::{archive::TarArchiver, fs::OsFileSystem, telemetry},
    runtime::PodmanCli,
    session::{HostContext, LaunchRequest, SessionLauncher},
};
use tracing::warn;

#[tokio::main]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<(), RuntimeExit> {
    let args = OccArgs::parse();
    let verbosity = telemetry::parse_verbosity(&args.verbosity);
    let level = verbosity
        .as_ref()
        .map_or(telemetry::DEFAULT_LEVEL, |level| *level);
    telemetry::init_tracing(level).map_err(RuntimeExit::from_error)?;
    if let Err(err) = verbosity {
        warn!(target: "occ::cli", reason = %err, "Falling back to warn verbosity");
    }

    let command = args.into_command().map_err(RuntimeExit::from_error)?;
    match command {
        ParsedCommand::Launch(profile, run) => run_session(profile, run).await,
        ParsedCommand::Cli(command) => handle_cli_command(command),
    }
}

async fn run_session(profile: LaunchProfile, run: RunArgs) -> Result<(), RuntimeExit> {
    let config =
        OccConfig::load_from_path(profile.config_path.clone()).map_err(RuntimeExit::from_error)?;
    let request = LaunchRequest {
        config_path: profile.config_path,
        args: run.cluster_id.into_iter().collect(),
        tag: run.tag.unwrap_or_else(|| config.image_tag.clone()),
        disable_console_port: run.disable_console_port,
    };

    let runtime = PodmanCli::new(config.podman_path.clone(), config.podman_socket.clone());
    let launcher = SessionLauncher::new(
        runtime,
        OsFileSystem,
        OsFileSystem,
        Arc::new(TarArchiver),
        HostContext::from_env(),
    );
    launcher
        .launch(&request, &config)
        .await
        .map(|_| ())
        .map_err(RuntimeExit::from_error)
}

fn handle_cli_command(command: CliCommand) -> Result<(), RuntimeExit> {
    let message = execute_cli_command(command).map_err(RuntimeExit::from_error)?;
    println!("{message}");
    Ok(())
}
