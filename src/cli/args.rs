//! CLI argument definitions and `LaunchProfile` construction.
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use super::{resolve_config_path, LaunchProfile};

/// Parsed command intent from CLI.
#[derive(Debug, Clone)]
pub enum ParsedCommand {
    Launch(LaunchProfile, RunArgs),
    Cli(CliCommand),
}

/// Commands that finish without starting a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Init { config_path: PathBuf },
    Version,
}

/// Top-level subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum OccCommand {
    /// Runs an OCM container instance.
    #[command(
        long_about = "Run will start up an OCM container instance using a given configuration file."
    )]
    Run(RunArgs),
    /// Initializes OCM container configuration.
    #[command(
        long_about = "init will create a config file at ~/.config/occ/config.yaml.\nIf a config.yaml file already exists, you will be asked if you want to overwrite it or exit out."
    )]
    Init,
    /// Gets version and build info for the command.
    Version,
}

/// Arguments for `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct RunArgs {
    /// Cluster to log into once the container is up.
    pub cluster_id: Option<String>,
    /// Sets the image tag to use (defaults to `image_tag` from the config file).
    #[arg(short = 't', long = "tag")]
    pub tag: Option<String>,
    /// Disable automatic cluster console port mapping.
    #[arg(short = 'd', long = "disable-console-port", default_value_t = false)]
    pub disable_console_port: bool,
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "occ",
    author,
    version,
    about = "OpenShift Command Center - A container-based workflow for SRE-ing OpenShift",
    long_about = "OpenShift Command Center - This application contains the configuration manipulation and container runtime launcher for managing OpenShift clusters"
)]
pub struct OccArgs {
    /// Config file location (default: ~/.config/occ/config.yaml).
    #[arg(long = "config", global = true)]
    pub config_override: Option<PathBuf>,
    /// Log level: panic, fatal, error, warn, info, debug, trace, or its index.
    /// `-v` without a value means debug.
    #[arg(
        short = 'v',
        long = "verbosity",
        global = true,
        default_value = "warn",
        num_args = 0..=1,
        default_missing_value = "debug"
    )]
    pub verbosity: String,
    #[command(subcommand)]
    pub command: OccCommand,
}

impl OccArgs {
    /// Build a `LaunchProfile` from CLI args and environment variables.
    pub fn build(&self) -> Result<LaunchProfile> {
        let config_path = resolve_config_path(self.config_override.clone())?;
        Ok(LaunchProfile { config_path })
    }

    /// Parse CLI args into either session launch mode or utility command mode.
    pub fn into_command(self) -> Result<ParsedCommand> {
        match self.command {
            OccCommand::Version => Ok(ParsedCommand::Cli(CliCommand::Version)),
            OccCommand::Init => {
                let profile = self.build()?;
                Ok(ParsedCommand::Cli(CliCommand::Init {
                    config_path: profile.config_path,
                }))
            }
            OccCommand::Run(ref run) => {
                let profile = self.build()?;
                Ok(ParsedCommand::Launch(profile, run.clone()))
            }
        }
    }
}
