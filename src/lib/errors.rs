use std::{fmt, io, path::PathBuf};

use config::ConfigError as ConfigLoaderError;
use thiserror::Error;

/// Errors that can occur while loading, validating or writing configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the configuration sources.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize the merged configuration into a struct.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Field failed validation.
    #[error("Configuration file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
    #[error("Failed to serialize configuration for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Failed to write configuration file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// Rejected `--verbosity` value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("not a valid log level: {value:?}")]
pub struct VerbosityError {
    pub value: String,
}

/// Failures of the macOS SSH agent directory scan.
#[derive(Debug, Error)]
pub enum AgentLocateError {
    #[error("Failed to list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No SSH agent directory found at {path}: {reason}")]
    NotFound { path: PathBuf, reason: String },
}

/// Failures while assembling the mount list.
#[derive(Debug, Error)]
pub enum MountError {
    /// The existence check itself failed; a missing path is not an error.
    #[error("Failed to check whether {path} exists: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to retrieve agent location: {0}")]
    AgentLocate(#[from] AgentLocateError),
}

/// Failures reported by a container runtime client.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with status {exit_code:?}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("Failed to decode output of `{command}`: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O failed while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("Container {operation} failed: {message}")]
    Failed {
        operation: &'static str,
        message: String,
    },
}

/// Failures of the host-side archive reader.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Invalid path glob `{glob}`: {source}")]
    Pattern {
        glob: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("Failed to walk glob matches: {source}")]
    Walk {
        #[source]
        source: glob::GlobError,
    },
    #[error("No host paths match `{glob}`")]
    NoMatch { glob: String },
    #[error("Path {path} is not valid UTF-8")]
    NonUtf8 { path: PathBuf },
    #[error("I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Archive producer stopped before completion: {message}")]
    Interrupted { message: String },
}

/// Stage failures of the host-to-container portmap relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to create a tempdir for portmap: {source}")]
    TempDir {
        #[source]
        source: io::Error,
    },
    #[error("failed to inspect container {container_id}: {source}")]
    InspectFailed {
        container_id: String,
        #[source]
        source: RuntimeError,
    },
    #[error("failed to create portmap file {path}: {source}")]
    FileCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write host port to portmap file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error copying portmap file from host: {source}")]
    ArchiveRead {
        #[source]
        source: ArchiveError,
    },
    #[error("failed to request copy into {container_id}:{path}: {source}")]
    CopyRequest {
        container_id: String,
        path: &'static str,
        #[source]
        source: RuntimeError,
    },
    #[error("error copying portmap file to container {container_id}: {source}")]
    CopyStream {
        container_id: String,
        #[source]
        source: RuntimeError,
    },
    #[error(transparent)]
    Aggregated(#[from] AggregatedRelayError),
}

/// One or two relay failures joined after both copy sides finished.
///
/// Consumer-side (container) errors are listed before producer-side (host) errors.
#[derive(Debug)]
pub struct AggregatedRelayError {
    errors: Vec<RelayError>,
}

impl AggregatedRelayError {
    pub fn new(errors: Vec<RelayError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[RelayError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<RelayError> {
        self.errors
    }
}

impl fmt::Display for AggregatedRelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        write!(
            f,
            "error copying portmap file from host to container: {count} error{} occurred:",
            if count == 1 { "" } else { "s" }
        )?;
        for error in &self.errors {
            write!(f, "\n\t* {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregatedRelayError {}

/// Fatal failures of one session launch.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Cannot find config file at {path}. Run occ init to create one.")]
    MissingConfig { path: PathBuf },
    #[error("Cannot determine the home directory: HOME is unset")]
    HomeUnavailable,
    #[error(transparent)]
    Mounts(#[from] MountError),
    #[error("Failed to create container: {source}")]
    Create {
        #[source]
        source: RuntimeError,
    },
    #[error("Failed to start container {container_id}: {source}")]
    Start {
        container_id: String,
        #[source]
        source: RuntimeError,
    },
    #[error("There was an error copying portmap file to the container: {source}")]
    Relay {
        #[source]
        source: RelayError,
    },
    #[error("There was an error attaching to container {container_id}: {source}")]
    Attach {
        container_id: String,
        #[source]
        source: RuntimeError,
    },
}
